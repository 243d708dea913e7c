use super::*;
use crate::config::DockConfig;
use crate::terminal::{ExecutionId, FakeTerminalHost, TerminalEvent, INTERRUPT_SEQUENCE};
use std::path::PathBuf;
use std::time::Duration;

fn executor() -> Executor<FakeTerminalHost> {
    let config = DockConfig {
        grace_period_ms: Some(1),
        interrupt_settle_ms: Some(1),
        shell: Some("/bin/zsh".to_string()),
    };
    Executor::new(FakeTerminalHost::new(), &config)
}

fn cwd() -> PathBuf {
    PathBuf::from("/work/app")
}

#[test]
fn test_run_creates_terminal_with_shell_and_cwd() {
    let mut exec = executor();
    exec.run("dev", "pnpm run dev", &cwd());

    assert_eq!(
        exec.host.created,
        vec![("dev".to_string(), cwd(), "/bin/zsh".to_string())]
    );
    assert!(exec.tracker().lock().is_running("dev"));
}

#[test]
fn test_capability_event_dispatches_queued_command() {
    let mut exec = executor();
    exec.run("dev", "pnpm run dev", &cwd());
    exec.handle_event(TerminalEvent::Opened {
        name: "dev".to_string(),
    });
    exec.handle_event(TerminalEvent::CapabilityAvailable {
        name: "dev".to_string(),
    });

    assert_eq!(exec.host.executed.len(), 1);
    assert_eq!(exec.host.executed[0].0, "dev");
    assert_eq!(exec.host.executed[0].1, "pnpm run dev");
    // The returned handle was recorded
    assert_eq!(
        exec.tracker().lock().phase("dev"),
        Some(crate::run_tracker::RunPhase::Trackable)
    );
}

#[test]
fn test_completion_event_marks_idle() {
    let mut exec = executor();
    exec.run("dev", "pnpm run dev", &cwd());
    exec.handle_event(TerminalEvent::Opened {
        name: "dev".to_string(),
    });
    exec.handle_event(TerminalEvent::CapabilityAvailable {
        name: "dev".to_string(),
    });
    let execution = exec.host.last_execution().unwrap();

    exec.handle_event(TerminalEvent::ExecutionEnded {
        name: "dev".to_string(),
        execution,
    });
    assert!(!exec.tracker().lock().is_running("dev"));
}

#[test]
fn test_stale_completion_event_ignored() {
    let mut exec = executor();
    exec.run("dev", "pnpm run dev", &cwd());
    exec.handle_event(TerminalEvent::Opened {
        name: "dev".to_string(),
    });
    exec.handle_event(TerminalEvent::CapabilityAvailable {
        name: "dev".to_string(),
    });

    exec.handle_event(TerminalEvent::ExecutionEnded {
        name: "dev".to_string(),
        execution: ExecutionId(9999),
    });
    assert!(exec.tracker().lock().is_running("dev"));
}

#[test]
fn test_grace_fallback_sends_raw_text() {
    let mut exec = executor();
    exec.run("dev", "pnpm run dev", &cwd());
    exec.handle_event(TerminalEvent::Opened {
        name: "dev".to_string(),
    });

    // Drive the grace timer deterministically
    exec.handle_deferred(DeferredEvent::GraceElapsed {
        name: "dev".to_string(),
        generation: 1,
    });

    assert_eq!(exec.host.sent_to("dev"), vec!["pnpm run dev\n"]);
    assert!(exec.host.executed.is_empty());
    assert!(exec.tracker().lock().is_running("dev"));
}

#[test]
fn test_settle_dispatch_executes_via_capability() {
    let mut exec = executor();
    exec.run("dev", "pnpm run dev", &cwd());
    exec.handle_event(TerminalEvent::Opened {
        name: "dev".to_string(),
    });
    exec.handle_event(TerminalEvent::CapabilityAvailable {
        name: "dev".to_string(),
    });

    // Second run into the busy, capability-ready terminal
    exec.run("dev", "pnpm run build", &cwd());
    assert_eq!(exec.host.sent_to("dev"), vec![INTERRUPT_SEQUENCE]);

    exec.handle_deferred(DeferredEvent::DispatchAfterInterrupt {
        name: "dev".to_string(),
        command: "pnpm run build".to_string(),
        generation: 2,
    });
    assert_eq!(exec.host.executed.last().unwrap().1, "pnpm run build");
}

#[test]
fn test_rapid_restarts_execute_only_the_latest_command() {
    let mut exec = executor();
    exec.run("dev", "cmd-a", &cwd());
    exec.handle_event(TerminalEvent::Opened {
        name: "dev".to_string(),
    });
    exec.handle_event(TerminalEvent::CapabilityAvailable {
        name: "dev".to_string(),
    });

    // Two restarts into the busy terminal before either settle timer fires
    exec.run("dev", "cmd-b", &cwd());
    exec.run("dev", "cmd-c", &cwd());

    exec.handle_deferred(DeferredEvent::DispatchAfterInterrupt {
        name: "dev".to_string(),
        command: "cmd-b".to_string(),
        generation: 2,
    });
    exec.handle_deferred(DeferredEvent::DispatchAfterInterrupt {
        name: "dev".to_string(),
        command: "cmd-c".to_string(),
        generation: 3,
    });

    let commands: Vec<&str> = exec.host.executed.iter().map(|(_, c, _)| c.as_str()).collect();
    assert!(!commands.contains(&"cmd-b"), "superseded command must not run");
    assert_eq!(commands.last(), Some(&"cmd-c"));
}

#[test]
fn test_stop_sends_interrupt_and_clears_state() {
    let mut exec = executor();
    exec.run("dev", "pnpm run dev", &cwd());
    exec.handle_event(TerminalEvent::Opened {
        name: "dev".to_string(),
    });

    exec.stop("dev");
    assert_eq!(exec.host.sent_to("dev"), vec![INTERRUPT_SEQUENCE]);
    assert!(!exec.tracker().lock().is_running("dev"));
}

#[test]
fn test_closed_event_clears_state() {
    let mut exec = executor();
    exec.run("dev", "pnpm run dev", &cwd());
    exec.handle_event(TerminalEvent::Opened {
        name: "dev".to_string(),
    });
    exec.handle_event(TerminalEvent::Closed {
        name: "dev".to_string(),
    });
    assert!(!exec.tracker().lock().is_running("dev"));
}

#[test]
fn test_pump_delivers_scheduled_grace_event() {
    let mut exec = executor();
    exec.run("dev", "pnpm run dev", &cwd());
    exec.handle_event(TerminalEvent::Opened {
        name: "dev".to_string(),
    });

    // 1ms grace period; wait for the timer thread to post the event
    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    while exec.host.sent_to("dev").is_empty() {
        assert!(
            std::time::Instant::now() < deadline,
            "grace event never arrived"
        );
        std::thread::sleep(Duration::from_millis(5));
        exec.pump();
    }
    assert_eq!(exec.host.sent_to("dev"), vec!["pnpm run dev\n"]);
}
