//! End-to-end tests of the `luawk` binary
//!
//! Each test writes a stand-in interpreter module into a temp directory and
//! points the binary at it with `LUAWK_PATH`.

use std::fs;
use std::process::{Command, Output};
use tempfile::TempDir;

const BIN: &str = env!("CARGO_BIN_EXE_luawk");

fn module_dir(source: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("luawk.lua"), source).unwrap();
    temp
}

fn luawk(dir: &TempDir) -> Command {
    let mut cmd = Command::new(BIN);
    cmd.env("LUAWK_PATH", dir.path())
        .env_remove("LUAWK_CONFIG")
        .env_remove("LUAWK_MODULE")
        .env_remove("LUAWK_CHECKPOINT")
        .env_remove("LUAWK_LOG");
    cmd
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_success_is_silent() {
    let dir = module_dir("io.write(#arg, '|', arg[1], '|', arg[2], '|', tostring(arg[3]))");
    let output = luawk(&dir).args(["-F:", "a b"]).output().unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "2|-F:|a b|nil");
    assert!(output.stderr.is_empty());
}

#[test]
fn test_arg_zero_is_program() {
    let dir = module_dir("io.write(arg[0])");
    let output = luawk(&dir).output().unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(String::from_utf8_lossy(&output.stdout), BIN);
}

#[test]
fn test_script_error_exits_one() {
    let dir = module_dir("error('boom')");
    let output = luawk(&dir).output().unwrap();
    let stderr = stderr(&output);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr.contains("boom"));
    assert!(stderr.contains("stack traceback:"));
    assert!(stderr.ends_with('\n'));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_opaque_error_exits_one() {
    let dir = module_dir("error({})");
    let output = luawk(&dir).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).starts_with("(error object is a table value)\nstack traceback:"));
}

#[test]
fn test_missing_module_exits_one() {
    let dir = TempDir::new().unwrap();
    let output = luawk(&dir).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).starts_with("luawk: module 'luawk' not found:"));
}

#[test]
fn test_module_override() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("otherawk.lua"), "io.write('other')").unwrap();
    let output = luawk(&dir).env("LUAWK_MODULE", "otherawk").output().unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "other");
}

#[test]
fn test_bad_config_exits_one() {
    let dir = module_dir("return");
    let output = luawk(&dir).env("LUAWK_CHECKPOINT", "often").output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).starts_with("luawk: Configuration error:"));
}

#[test]
fn test_config_file() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("fileawk.lua"), "io.write('from file config')").unwrap();
    let config = dir.path().join("luawk.json");
    fs::write(
        &config,
        serde_json::json!({
            "entry_module": "fileawk",
            "module_paths": [dir.path()],
        })
        .to_string(),
    )
    .unwrap();

    let output = Command::new(BIN)
        .env("LUAWK_CONFIG", &config)
        .env_remove("LUAWK_PATH")
        .env_remove("LUAWK_MODULE")
        .env_remove("LUAWK_CHECKPOINT")
        .env_remove("LUAWK_LOG")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "from file config");
}

#[cfg(unix)]
mod signals {
    use super::*;
    use std::io::{BufRead, BufReader};
    use std::os::unix::process::ExitStatusExt;
    use std::process::{Child, ChildStdout, Stdio};
    use std::thread;
    use std::time::Duration;

    fn spawn(dir: &TempDir) -> (Child, BufReader<ChildStdout>) {
        let mut child = luawk(dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        let stdout = BufReader::new(child.stdout.take().unwrap());
        (child, stdout)
    }

    fn read_line(reader: &mut BufReader<ChildStdout>) -> String {
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        line
    }

    fn interrupt(child: &Child) {
        let pid = libc::pid_t::try_from(child.id()).unwrap();
        // SAFETY: plain kill(2) on our own child.
        let rc = unsafe { libc::kill(pid, libc::SIGINT) };
        assert_eq!(rc, 0);
    }

    #[test]
    fn test_interrupt_reported_through_error_path() {
        let dir = module_dir(
            "io.write('ready\\n')\n\
             io.stdout:flush()\n\
             while true do end",
        );
        let (child, mut stdout) = spawn(&dir);

        assert_eq!(read_line(&mut stdout), "ready\n");
        interrupt(&child);
        let output = child.wait_with_output().unwrap();
        let stderr = stderr(&output);

        assert_eq!(output.status.code(), Some(1));
        assert!(stderr.starts_with("interrupted!\nstack traceback:"));
    }

    #[test]
    fn test_second_interrupt_terminates() {
        let dir = module_dir(
            "io.write('ready\\n')\n\
             io.stdout:flush()\n\
             local ok, err = pcall(function() while true do end end)\n\
             local caught = tostring(err):find('interrupted!', 1, true) and 'interrupt' or 'other'\n\
             io.write('caught ', caught, '\\n')\n\
             io.stdout:flush()\n\
             while true do end",
        );
        let (child, mut stdout) = spawn(&dir);

        assert_eq!(read_line(&mut stdout), "ready\n");
        interrupt(&child);
        assert_eq!(read_line(&mut stdout), "caught interrupt\n");
        interrupt(&child);

        let output = child.wait_with_output().unwrap();
        assert_eq!(output.status.code(), None);
        assert_eq!(output.status.signal(), Some(libc::SIGINT));
    }

    #[test]
    fn test_second_interrupt_before_checkpoint_terminates() {
        let dir = module_dir(
            "io.write('ready\\n')\n\
             io.stdout:flush()\n\
             io.read()",
        );
        let mut child = luawk(&dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        // held open so the read blocks in native code
        let _stdin = child.stdin.take().unwrap();
        let mut stdout = BufReader::new(child.stdout.take().unwrap());

        assert_eq!(read_line(&mut stdout), "ready\n");
        thread::sleep(Duration::from_millis(200));
        interrupt(&child);
        thread::sleep(Duration::from_millis(200));
        interrupt(&child);

        let output = child.wait_with_output().unwrap();
        assert_eq!(output.status.code(), None);
        assert_eq!(output.status.signal(), Some(libc::SIGINT));
        assert!(output.stderr.is_empty());
    }
}
