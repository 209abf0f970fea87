// tests/pipeline_exec.rs
//
// These tests fork real processes. The shell reaps with `waitpid(-1, ..)`,
// which would steal children from a concurrently running test, so every
// test holds `serial()` for its whole duration.

use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitPidFlag};
use nix::unistd::{getpgid, Pid};
use pssh::config::ConfigFile;
use pssh::errors::ShellError;
use pssh::shell::Shell;
use pssh::signals::{OsSignaller, Terminal};
use pssh::types::JobStatus;
use pssh_test_utils::{
    init_tracing, with_timeout, ConfigFileBuilder, PipelineBuilder, SharedOutput,
};
use tokio::io::BufReader;

static SERIAL: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn shell_with(config: ConfigFile) -> (Shell, SharedOutput) {
    init_tracing();
    let out = SharedOutput::new();
    let shell = Shell::new(
        config,
        Box::new(Terminal::detached()),
        Box::new(OsSignaller),
        Box::new(out.clone()),
    )
    .unwrap();
    (shell, out)
}

fn shell() -> (Shell, SharedOutput) {
    shell_with(ConfigFileBuilder::new().build())
}

async fn drain(shell: &mut Shell) {
    with_timeout(async {
        while !shell.jobs().is_empty() {
            shell.next_notification().await.unwrap();
        }
    })
    .await;
}

fn no_children_left() -> bool {
    matches!(
        waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)),
        Err(Errno::ECHILD)
    )
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

#[tokio::test]
async fn foreground_pipeline_runs_to_completion_silently() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let out_file = dir.path().join("out.txt");
    let (mut shell, out) = shell();

    let line = format!("echo hello world | tr a-z A-Z > {}", out_file.display());
    let exit = with_timeout(shell.execute_line(&line)).await.unwrap();

    assert_eq!(exit, None);
    assert!(shell.jobs().is_empty());
    assert_eq!(read(&out_file), "HELLO WORLD\n");
    assert_eq!(out.contents(), "");
    assert!(no_children_left());
}

#[tokio::test]
async fn input_and_output_redirection_apply_to_the_ends() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.txt");
    let output = dir.path().join("out.txt");
    fs::write(&input, "b\na\nb\nc\n").unwrap();
    let (mut shell, _out) = shell();

    let line = format!("sort < {} | uniq | wc -l > {}", input.display(), output.display());
    with_timeout(shell.execute_line(&line)).await.unwrap();

    assert_eq!(read(&output).trim(), "3");
}

#[tokio::test]
async fn background_pipeline_is_announced_then_reported_done_once() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let out_file = dir.path().join("count.txt");
    let (mut shell, out) = shell();

    let line = format!("echo hi | cat | wc -l > {} &", out_file.display());
    with_timeout(shell.execute_line(&line)).await.unwrap();

    let job = shell.jobs().get(0).expect("job in slot 0");
    assert_eq!(job.pids().len(), 3);
    assert_eq!(job.status(), JobStatus::Background);
    assert_eq!(job.process_group(), Some(job.pids()[0]));
    let pids: Vec<String> = job.pids().iter().map(ToString::to_string).collect();
    assert_eq!(out.lines(), vec![format!("[0] {}", pids.join(" "))]);

    drain(&mut shell).await;

    let done = format!("[0] + done\t{line}");
    let lines = out.lines();
    assert_eq!(lines.iter().filter(|l| **l == done).count(), 1);
    assert_eq!(lines.len(), 2);
    assert_eq!(read(&out_file).trim(), "1");
    assert!(no_children_left());
}

#[tokio::test]
async fn stopped_foreground_job_can_be_resumed_in_background() {
    let _guard = serial();
    let (mut shell, out) = shell();
    let pipeline = PipelineBuilder::new()
        .stage(["sh", "-c", "kill -STOP $$"])
        .build();

    let slot = with_timeout(shell.run_pipeline(&pipeline, "stopper"))
        .await
        .unwrap();

    assert_eq!(shell.jobs().get(slot).unwrap().status(), JobStatus::Stopped);
    assert_eq!(out.lines(), vec!["[0] + suspended\tstopper"]);

    out.clear();
    with_timeout(shell.execute_line("bg %0")).await.unwrap();
    drain(&mut shell).await;

    assert!(out.lines().contains(&"[0] + done\tstopper".to_string()));
    assert!(no_children_left());
}

#[tokio::test]
async fn fg_waits_for_a_resumed_job() {
    let _guard = serial();
    let (mut shell, out) = shell();
    let pipeline = PipelineBuilder::new()
        .stage(["sh", "-c", "kill -STOP $$"])
        .build();
    with_timeout(shell.run_pipeline(&pipeline, "stopper"))
        .await
        .unwrap();

    with_timeout(shell.execute_line("fg %0")).await.unwrap();

    // Foreground completion prints nothing beyond the earlier suspension.
    assert!(shell.jobs().is_empty());
    assert!(!out.contents().contains("done"));
    assert!(no_children_left());
}

#[tokio::test]
async fn killing_a_background_job_reports_it_terminated() {
    let _guard = serial();
    let (mut shell, out) = shell();

    with_timeout(shell.execute_line("sleep 30 &")).await.unwrap();
    with_timeout(shell.execute_line("kill -s 9 %0")).await.unwrap();
    drain(&mut shell).await;

    assert_eq!(out.lines().last().unwrap(), "[0] + terminated\tsleep 30 &");
    assert!(no_children_left());
}

#[tokio::test]
async fn missing_command_mid_pipeline_cleans_up_started_stages() {
    let _guard = serial();
    let (mut shell, _out) = shell();

    let err = with_timeout(shell.execute_line("sleep 30 | pssh-no-such-command | cat"))
        .await
        .unwrap_err();

    assert!(matches!(err, ShellError::CommandNotFound(ref cmd) if cmd == "pssh-no-such-command"));
    assert_eq!(err.to_string(), "command not found: pssh-no-such-command");
    assert!(shell.jobs().is_empty());
    assert!(no_children_left());
}

#[tokio::test]
async fn unreadable_redirect_aborts_before_any_fork() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let (mut shell, _out) = shell();

    let line = format!("cat < {}", dir.path().join("absent").display());
    let err = with_timeout(shell.execute_line(&line)).await.unwrap_err();

    assert!(matches!(err, ShellError::Redirect { .. }));
    assert!(err.to_string().starts_with("could not open "));
    assert!(shell.jobs().is_empty());
    assert!(no_children_left());
}

#[tokio::test]
async fn slots_are_reused_lowest_first() {
    let _guard = serial();
    let (mut shell, out) = shell();

    with_timeout(shell.execute_line("sleep 30 &")).await.unwrap();
    with_timeout(shell.execute_line("sleep 30 &")).await.unwrap();
    with_timeout(shell.execute_line("kill -9 %0")).await.unwrap();
    with_timeout(async {
        while shell.jobs().get(0).is_some() {
            shell.next_notification().await.unwrap();
        }
    })
    .await;

    out.clear();
    with_timeout(shell.execute_line("sleep 30 &")).await.unwrap();
    assert!(out.lines()[0].starts_with("[0] "));
    assert_eq!(shell.jobs().active(), 2);

    with_timeout(shell.execute_line("kill -9 %0 %1")).await.unwrap();
    drain(&mut shell).await;
    assert!(no_children_left());
}

#[tokio::test]
async fn builtin_output_can_be_redirected() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("signals.txt");
    let (mut shell, out) = shell();

    with_timeout(shell.execute_line(&format!("kill -l > {}", target.display())))
        .await
        .unwrap();

    assert_eq!(read(&target).lines().count(), 31);
    assert_eq!(out.contents(), "");
    assert!(shell.jobs().is_empty());
}

#[tokio::test]
async fn builtin_inside_a_pipeline_is_rejected() {
    let _guard = serial();
    let (mut shell, _out) = shell();

    let err = with_timeout(shell.execute_line("jobs | wc -l"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "builtin cannot be used in a pipeline: jobs");
    assert!(shell.jobs().is_empty());
}

#[tokio::test]
async fn prompt_loop_runs_lines_until_exit() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let out_file = dir.path().join("loop.txt");
    let (mut shell, out) = shell_with(ConfigFileBuilder::new().with_prompt("> ").build());

    let script = format!(
        "echo looped > {}\nbogus-pssh-command\n\njobs\nexit 3\necho unreachable\n",
        out_file.display()
    );
    let code = with_timeout(shell.run(BufReader::new(script.as_bytes())))
        .await
        .unwrap();

    assert_eq!(code, 3);
    assert_eq!(read(&out_file), "looped\n");
    let text = out.contents();
    assert!(text.contains("pssh: command not found: bogus-pssh-command\n"));
    assert_eq!(text.matches("> ").count(), 5);
    assert!(!text.contains("unreachable"));
}

#[tokio::test]
async fn prompt_loop_exits_cleanly_at_end_of_input() {
    let _guard = serial();
    let (mut shell, out) = shell_with(ConfigFileBuilder::new().with_banner(true).build());

    let code = with_timeout(shell.run(BufReader::new(&b""[..]))).await.unwrap();

    assert_eq!(code, 0);
    assert!(out.contents().contains("Type 'exit' to quit"));
}

#[tokio::test]
async fn prompt_loop_survives_undecodable_input() {
    let _guard = serial();
    let (mut shell, out) = shell();

    let code = with_timeout(shell.run(BufReader::new(&b"true \xff\xfe\nexit 7\n"[..])))
        .await
        .unwrap();

    assert_eq!(code, 7);
    assert!(!out.contents().contains("pssh:"));
    assert!(shell.jobs().is_empty());
    assert!(no_children_left());
}

#[tokio::test]
async fn every_stage_joins_the_job_process_group() {
    let _guard = serial();
    let (mut shell, _out) = shell();

    with_timeout(shell.execute_line("sleep 30 | sleep 30 | sleep 30 &"))
        .await
        .unwrap();

    let job = shell.jobs().get(0).expect("job in slot 0");
    assert_eq!(job.pids().len(), 3);
    let group = job.process_group().expect("group set by first stage");
    assert_eq!(group, job.pids()[0]);
    for &pid in job.pids() {
        assert_eq!(getpgid(Some(pid)).unwrap(), group, "stage {pid} outside the job group");
    }
    assert_ne!(getpgid(None).unwrap(), group);

    with_timeout(shell.execute_line("kill -9 %0")).await.unwrap();
    drain(&mut shell).await;
    assert!(no_children_left());
}

#[tokio::test]
async fn configured_search_path_replaces_path() {
    let _guard = serial();
    let (mut shell, _out) =
        shell_with(ConfigFileBuilder::new().with_search_path("/nonexistent-pssh-bin").build());

    let err = with_timeout(shell.execute_line("echo hi")).await.unwrap_err();

    assert_eq!(err.to_string(), "command not found: echo");
    assert!(shell.jobs().is_empty());
    assert!(no_children_left());
}
