//! The `FS` capability object used from scripts

use gantry_value::Value;

use super::temp_backends;
use crate::{Bindings, Capability, ScriptError, Session};

const DATA: &str = "HELLO WORLD gantry";

fn fs_bindings() -> Bindings {
    Bindings::new().with("FS", Capability::Fs)
}

async fn run_with_fs(backends: gantry_fs::Backends, source: &str) -> Result<Value, ScriptError> {
    let mut session = Session::new(backends)?;
    let mut ctx = session.new_context(&fs_bindings())?;
    ctx.run(source).await
}

#[tokio::test]
async fn test_fs_read_file() {
    let (dir, backends) = temp_backends();
    std::fs::write(dir.path().join("f1.file"), DATA).unwrap();

    let text = run_with_fs(
        backends.clone(),
        r#"
        function ReadFile() {
            var fs = new FS("system");
            return fs.ReadFile("/f1.file");
        }
        ReadFile()
        "#,
    )
    .await
    .expect("ReadFile should succeed");
    assert_eq!(text, Value::from(DATA));

    let buffer = run_with_fs(
        backends,
        r#"
        const data = new FS("system").ReadFileBuffer("/f1.file");
        if (!(data instanceof Uint8Array)) throw new Error("expected a Uint8Array");
        data
        "#,
    )
    .await
    .expect("ReadFileBuffer should succeed");
    assert_eq!(buffer, Value::bytes(DATA.as_bytes()));
}

#[tokio::test]
async fn test_fs_write_file() {
    let (dir, backends) = temp_backends();
    std::fs::write(dir.path().join("f1.file"), DATA).unwrap();

    let result = run_with_fs(
        backends,
        r#"
        var fs = new FS("system");
        var res = {};
        res.WriteFile = fs.WriteFile("/f3.file", "written from js", 0o644);
        var data = fs.ReadFileBuffer("/f1.file");
        res.WriteFileBuffer = fs.WriteFileBuffer("/f2.file", data, 0o644);
        res.Copy = fs.ReadFileBuffer("/f2.file");
        res
        "#,
    )
    .await
    .expect("writes should succeed");

    assert_eq!(result.get("WriteFile"), Some(&Value::from("written from js".len())));
    assert_eq!(result.get("WriteFileBuffer"), Some(&Value::from(DATA.len())));
    assert_eq!(result.get("Copy"), Some(&Value::bytes(DATA.as_bytes())));
    assert_eq!(
        std::fs::read_to_string(dir.path().join("f3.file")).unwrap(),
        "written from js"
    );
}

#[tokio::test]
async fn test_fs_exists_and_remove() {
    let (dir, backends) = temp_backends();
    std::fs::write(dir.path().join("f1.file"), DATA).unwrap();
    std::fs::create_dir_all(dir.path().join("d1/d2")).unwrap();
    std::fs::write(dir.path().join("d1/d2/f1.file"), DATA).unwrap();

    let result = run_with_fs(
        backends,
        r#"
        function ExistRemove() {
            var res = {};
            var fs = new FS("system");
            res["ExistsTrue"] = fs.Exists("/f1.file");
            res["ExistsFalse"] = fs.Exists("/f2.file");
            res["IsDirTrue"] = fs.IsDir("/d1");
            res["IsDirFalse"] = fs.IsDir("/f1.file");
            res["IsFileTrue"] = fs.IsFile("/f1.file");
            res["IsFileFalse"] = fs.IsFile("/d1");
            res["Remove"] = fs.Remove("/f1.file");
            res["RemoveNotExists"] = fs.Remove("/f2.file");
            try {
                fs.Remove("/d1");
            } catch (err) {
                res["RemoveError"] = err.message;
            }
            res["RemoveAll"] = fs.RemoveAll("/d1");
            res["RemoveAllNotExists"] = fs.RemoveAll("/d1/d2");
            return res;
        }
        ExistRemove()
        "#,
    )
    .await
    .expect("script should succeed");

    assert_eq!(result.get("ExistsTrue"), Some(&Value::Bool(true)));
    assert_eq!(result.get("ExistsFalse"), Some(&Value::Bool(false)));
    assert_eq!(result.get("IsDirTrue"), Some(&Value::Bool(true)));
    assert_eq!(result.get("IsDirFalse"), Some(&Value::Bool(false)));
    assert_eq!(result.get("IsFileTrue"), Some(&Value::Bool(true)));
    assert_eq!(result.get("IsFileFalse"), Some(&Value::Bool(false)));
    assert_eq!(result.get("Remove"), Some(&Value::Null));
    assert_eq!(result.get("RemoveNotExists"), Some(&Value::Null));
    assert!(
        result
            .get("RemoveError")
            .and_then(Value::as_str)
            .is_some_and(|m| m.contains("directory not empty"))
    );
    assert_eq!(result.get("RemoveAll"), Some(&Value::Null));
    assert_eq!(result.get("RemoveAllNotExists"), Some(&Value::Null));
    assert!(!dir.path().join("d1").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_fs_file_info() {
    let (dir, backends) = temp_backends();
    std::fs::write(dir.path().join("f1.file"), DATA).unwrap();
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(
            dir.path().join("f1.file"),
            std::fs::Permissions::from_mode(0o644),
        )
        .unwrap();
    }

    let result = run_with_fs(
        backends,
        r#"
        var res = {};
        var fs = new FS("system");
        res["BaseName"] = fs.BaseName("/f1.file");
        res["DirName"] = fs.DirName("/f1.file");
        res["ExtName"] = fs.ExtName("/f1.file");
        res["MimeType"] = fs.MimeType("/f1.file");
        res["Size"] = fs.Size("/f1.file");
        res["ModTime"] = fs.ModTime("/f1.file");
        res["Mode"] = fs.Mode("/f1.file");
        res["Chmod"] = fs.Chmod("/f1.file", 0o755);
        res["ModeAfter"] = fs.Mode("/f1.file");
        res
        "#,
    )
    .await
    .expect("script should succeed");

    assert_eq!(result.get("BaseName"), Some(&Value::from("f1.file")));
    assert_eq!(result.get("DirName"), Some(&Value::from("/")));
    assert_eq!(result.get("ExtName"), Some(&Value::from("file")));
    assert_eq!(
        result.get("MimeType"),
        Some(&Value::from("text/plain; charset=utf-8"))
    );
    assert_eq!(result.get("Size"), Some(&Value::from(DATA.len())));
    assert_eq!(result.get("Mode"), Some(&Value::from(0o644)));
    assert_eq!(result.get("ModeAfter"), Some(&Value::from(0o755)));
    assert_eq!(result.get("Chmod"), Some(&Value::Null));

    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let modified = result.get("ModTime").and_then(Value::as_i64).unwrap();
    assert!(modified > 0 && modified.unsigned_abs() <= now);
}

#[tokio::test]
async fn test_fs_directories() {
    let (_dir, backends) = temp_backends();

    let result = run_with_fs(
        backends,
        r#"
        function DirTest() {
            var fs = new FS("system");
            fs.WriteFile("/top.file", "top");
            fs.Mkdir("/d1");
            fs.WriteFile("/d1/f1.file", "nested");
            fs.MkdirAll("/empty");
            var listing = fs.ReadDir("/", true);
            var temp = fs.MkdirTemp("/d1", "*-logs");
            return { listing: listing, temp: temp, isDir: fs.IsDir(temp) };
        }
        DirTest()
        "#,
    )
    .await
    .expect("script should succeed");

    let listing = result.get("listing").and_then(Value::as_array).unwrap();
    assert_eq!(listing.len(), 5);
    assert_eq!(listing[0], Value::from("/"));

    let temp = result.get("temp").and_then(Value::as_str).unwrap();
    assert!(temp.starts_with("/d1/") && temp.ends_with("-logs"));
    assert_eq!(result.get("isDir"), Some(&Value::Bool(true)));
}

#[tokio::test]
async fn test_fs_errors_are_catchable() {
    let (_dir, backends) = temp_backends();

    let result = run_with_fs(
        backends,
        r#"
        var fs = new FS("system");
        var caught = [];
        for (const attempt of [
            () => fs.ReadFile("/missing.txt"),
            () => fs.ReadFile("/../outside.txt"),
            () => new FS("nowhere").Exists("/"),
        ]) {
            try {
                attempt();
                caught.push("no error");
            } catch (err) {
                caught.push(err instanceof Error ? err.message : "not an Error");
            }
        }
        caught
        "#,
    )
    .await
    .expect("script should succeed");

    let messages: Vec<&str> = result
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(messages.len(), 3);
    assert!(messages[0].contains("no such file or directory"));
    assert!(messages[1].contains("permission denied"));
    assert!(messages[2].contains("not registered"));
}

#[tokio::test]
async fn test_fs_errors_carry_their_kind() {
    let (dir, backends) = temp_backends();
    std::fs::create_dir(dir.path().join("full")).unwrap();
    std::fs::write(dir.path().join("full/a.txt"), "a").unwrap();

    let result = run_with_fs(
        backends,
        r#"
        var fs = new FS("system");
        var kinds = [];
        for (const attempt of [
            () => fs.ReadFile("/missing.txt"),
            () => fs.Remove("/full"),
            () => fs.ReadFile(),
        ]) {
            try {
                attempt();
            } catch (err) {
                kinds.push(err.kind);
            }
        }
        kinds
        "#,
    )
    .await
    .expect("script should succeed");

    assert_eq!(
        result,
        Value::Array(vec![
            "NotFound".into(),
            "DirectoryNotEmpty".into(),
            "ArgumentShape".into(),
        ])
    );
}

#[tokio::test]
async fn test_fs_uncaught_error_fails_the_script() {
    let (_dir, backends) = temp_backends();
    let err = run_with_fs(backends, r#"new FS("system").ReadFile("/missing.txt")"#)
        .await
        .expect_err("should fail");
    assert!(matches!(err, ScriptError::Execution(ref m) if m.contains("missing.txt")));
}
