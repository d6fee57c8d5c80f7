mod common;

use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use common::write_input_log;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_replay_happy_path() {
    let log = write_input_log(&[
        "event, generating_receipt, , ,",
        "event, receipt_generated, , ,",
        "event, generating_pid, , ,",
        "event, pid_generated, INC-4821, ,",
    ]);

    let mut cmd = Command::new(cargo_bin!("regfinal"));
    cmd.arg("replay").arg(log.path()).arg("--seed").arg("payment-confirmed");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "payment,receipt,pid,participant_id,failed",
        ))
        .stdout(predicate::str::contains("success,success,success,INC-4821,false"))
        .stdout(predicate::str::contains("Participant ID: INC-4821"));
}

#[test]
fn test_replay_failed_seed() {
    let log = write_input_log(&["event, generating_receipt, , ,"]);

    let mut cmd = Command::new(cargo_bin!("regfinal"));
    cmd.arg("replay")
        .arg(log.path())
        .arg("--seed")
        .arg("failed")
        .arg("--refund-window")
        .arg("10 days");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("error,error,error,,true"))
        .stdout(predicate::str::contains("refunded within 10 days"));
}

#[test]
fn test_replay_resume_from_status_read() {
    let log = write_input_log(&["poll, , INC-7777, true,"]);

    let mut cmd = Command::new(cargo_bin!("regfinal"));
    cmd.arg("replay").arg(log.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("success,success,success,INC-7777,false"));
}

#[test]
fn test_replay_in_progress_shows_steps() {
    let log = write_input_log(&["poll, , , , GENERATING_RECEIPT"]);

    let mut cmd = Command::new(cargo_bin!("regfinal"));
    cmd.arg("replay").arg(log.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("success,loading,pending,,false"))
        .stdout(predicate::str::contains("Receipt"));
}

#[test]
fn test_replay_missing_file() {
    let mut cmd = Command::new(cargo_bin!("regfinal"));
    cmd.arg("replay").arg("does-not-exist.csv");

    cmd.assert().failure();
}

#[test]
fn test_demo_reveals_participant_id() {
    let mut cmd = Command::new(cargo_bin!("regfinal"));
    cmd.arg("demo").arg("--pid").arg("INC-1234");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Participant ID: INC-1234"));
}
