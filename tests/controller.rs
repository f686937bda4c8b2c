use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use sheet_stacker::config::RunConfig;
use sheet_stacker::execution::{CombineController, FileObserver, RunEvent, RunOutcome, RunState};

fn tmp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("sheet-stacker-ctl-it-{name}-{nanos}"));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_people_xlsx(path: &Path, names: &[&str]) {
    use rust_xlsxwriter::Workbook;

    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    ws.set_name("Sheet1").unwrap();
    ws.write_string(0, 0, "name").unwrap();
    ws.write_string(0, 1, "score").unwrap();
    for (i, name) in names.iter().enumerate() {
        let row = i as u32 + 1;
        ws.write_string(row, 0, *name).unwrap();
        ws.write_number(row, 1, 10.0 * (i as f64 + 1.0)).unwrap();
    }
    wb.save(path).unwrap();
}

#[test]
fn background_run_delivers_ordered_events_and_completes() {
    let dir = tmp_dir("bg");
    write_people_xlsx(&dir.join("a.xlsx"), &["Ada", "Grace"]);
    write_people_xlsx(&dir.join("b.xlsx"), &["Linus"]);
    let log_path = dir.join("run.log");
    let out = dir.join("out").join("combined.xlsx");

    let mut ctl = CombineController::new().with_observer(Arc::new(FileObserver::new(&log_path)));
    ctl.start(RunConfig::new(&dir, &out)).unwrap();

    let mut events = Vec::new();
    while let Some(event) = ctl.recv_timeout(Duration::from_secs(30)) {
        let done = matches!(event, RunEvent::Finished(_));
        events.push(event);
        if done {
            break;
        }
    }

    let outcome = ctl.wait().unwrap();
    assert!(matches!(outcome, RunOutcome::Completed { rows: 3, columns: 3, .. }));
    assert_eq!(ctl.state(), RunState::Completed);
    assert!(!ctl.is_running());
    assert!(out.exists());

    assert_eq!(events.last(), Some(&RunEvent::Finished(outcome)));
    let finished = events
        .iter()
        .filter(|e| matches!(e, RunEvent::Finished(_)))
        .count();
    assert_eq!(finished, 1);

    let percents: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            RunEvent::Progress(p) => Some(p.percent),
            _ => None,
        })
        .collect();
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    assert!(percents.contains(&50));
    assert_eq!(percents.last(), Some(&100));

    // a.xlsx is logged before b.xlsx.
    let logs: Vec<String> = events
        .iter()
        .filter_map(|e| match e {
            RunEvent::Log(l) => Some(l.message.clone()),
            _ => None,
        })
        .collect();
    let a = logs.iter().position(|m| m.contains("a.xlsx")).unwrap();
    let b = logs.iter().position(|m| m.contains("b.xlsx")).unwrap();
    assert!(a < b);

    let log_text = fs::read_to_string(&log_path).unwrap();
    assert!(log_text.contains("finished completed"));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn cancel_before_first_file_yields_cancelled_without_output() {
    let dir = tmp_dir("cancel");
    for i in 0..3 {
        write_people_xlsx(&dir.join(format!("f{i}.xlsx")), &["x"]);
    }
    let out = dir.join("out").join("combined.xlsx");

    let mut ctl = CombineController::new();
    ctl.start(RunConfig::new(&dir, &out)).unwrap();
    ctl.cancel();
    let outcome = ctl.wait().unwrap();

    // The worker may already be past a few files; it never writes after a cancel.
    match outcome {
        RunOutcome::Cancelled { processed, total } => {
            assert_eq!(total, 3);
            assert!(processed <= 3);
            assert!(!out.exists());
        }
        RunOutcome::Completed { .. } => assert!(out.exists()),
        other => panic!("unexpected outcome: {other:?}"),
    }

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn cancel_token_from_another_thread_stops_the_run() {
    let dir = tmp_dir("token");
    for i in 0..3 {
        write_people_xlsx(&dir.join(format!("f{i}.xlsx")), &["x"]);
    }
    let out = dir.join("out").join("combined.xlsx");

    let mut ctl = CombineController::new();
    ctl.start(RunConfig::new(&dir, &out)).unwrap();
    // Absent only if the run already finished.
    if let Some(token) = ctl.cancel_token() {
        std::thread::spawn(move || token.cancel()).join().unwrap();
    }

    match ctl.wait().unwrap() {
        RunOutcome::Cancelled { total, .. } => {
            assert_eq!(total, 3);
            assert!(!out.exists());
            assert_eq!(ctl.state(), RunState::Cancelled);
        }
        RunOutcome::Completed { .. } => assert!(out.exists()),
        other => panic!("unexpected outcome: {other:?}"),
    }

    let _ = fs::remove_dir_all(&dir);
}
