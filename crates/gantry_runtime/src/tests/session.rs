//! Session and context lifecycle

use gantry_value::Value;

use super::temp_backends;
use crate::{Bindings, Capability, ScriptError, Session};

#[tokio::test]
async fn test_nothing_exposed_by_default() {
    let (_dir, backends) = temp_backends();
    let mut session = Session::new(backends).unwrap();
    let mut ctx = session.new_context(&Bindings::new()).unwrap();

    let result = ctx.run("typeof FS").await.unwrap();
    assert_eq!(result, Value::from("undefined"));
}

#[tokio::test]
async fn test_bindings_are_removed_with_the_context() {
    let (_dir, backends) = temp_backends();
    let mut session = Session::new(backends).unwrap();

    {
        let bindings = Bindings::new()
            .with("FS", Capability::Fs)
            .with("Files", Capability::Fs);
        let mut ctx = session.new_context(&bindings).unwrap();
        let result = ctx.run("[typeof FS, typeof Files]").await.unwrap();
        assert_eq!(
            result,
            Value::Array(vec![Value::from("function"), Value::from("function")])
        );
    }

    let mut ctx = session.new_context(&Bindings::new()).unwrap();
    let result = ctx.run("[typeof FS, typeof Files]").await.unwrap();
    assert_eq!(
        result,
        Value::Array(vec![Value::from("undefined"), Value::from("undefined")])
    );
}

#[tokio::test]
async fn test_contexts_do_not_share_globals() {
    let (_dir, backends) = temp_backends();
    let mut session = Session::new(backends).unwrap();

    {
        let mut ctx = session.new_context(&Bindings::new()).unwrap();
        ctx.run("var leaked = 1; globalThis.Store = 'original'; console = null; 'ok'")
            .await
            .unwrap();
    }
    {
        let bindings = Bindings::new()
            .with("Store", Capability::Fs)
            .with("Math", Capability::Fs);
        let mut ctx = session.new_context(&bindings).unwrap();
        let result = ctx.run("[typeof Store, typeof Math.max]").await.unwrap();
        assert_eq!(
            result,
            Value::Array(vec![Value::from("function"), Value::from("undefined")])
        );
    }

    let mut ctx = session.new_context(&Bindings::new()).unwrap();
    let result = ctx
        .run("[typeof leaked, typeof Store, typeof Math.max, typeof console.log]")
        .await
        .unwrap();
    assert_eq!(
        result,
        Value::Array(vec![
            Value::from("undefined"),
            Value::from("undefined"),
            Value::from("function"),
            Value::from("function"),
        ])
    );
}

#[tokio::test]
async fn test_engine_internals_are_unreachable() {
    let (dir, backends) = temp_backends();
    std::fs::write(dir.path().join("secret.txt"), "secret").unwrap();
    let mut session = Session::new(backends).unwrap();
    let mut ctx = session.new_context(&Bindings::new()).unwrap();

    let result = ctx
        .run(
            r#"
            var seen = [
                typeof Deno,
                typeof globalThis.__bootstrap,
                typeof globalThis[Symbol.for("gantry.bootstrap")],
            ];
            var entry = Reflect.ownKeys(globalThis)
                .find((k) => typeof k === "string" && k.startsWith("__gantry_"));
            try {
                globalThis[entry]("guessed", "install", { Stolen: "fs" });
                seen.push("installed");
            } catch (err) {
                seen.push(err.message);
            }
            seen.push(typeof Stolen);
            seen
            "#,
        )
        .await
        .unwrap();

    assert_eq!(
        result,
        Value::Array(vec![
            Value::from("undefined"),
            Value::from("undefined"),
            Value::from("undefined"),
            Value::from("not permitted"),
            Value::from("undefined"),
        ])
    );
}

#[tokio::test]
async fn test_functions_survive_between_calls() {
    let (_dir, backends) = temp_backends();
    let mut session = Session::new(backends).unwrap();
    let mut ctx = session.new_context(&Bindings::new()).unwrap();

    ctx.run(
        r"
        function add(a, b) { return a + b; }
        async function later(v) { return { wrapped: v }; }
        ",
    )
    .await
    .unwrap();

    let sum = ctx
        .call("add", vec![Value::Int(2), Value::Float(0.5)])
        .await
        .unwrap();
    assert_eq!(sum, Value::Float(2.5));

    let wrapped = ctx.call("later", vec![Value::from("x")]).await.unwrap();
    assert_eq!(wrapped.get("wrapped"), Some(&Value::from("x")));
}

#[tokio::test]
async fn test_call_missing_function() {
    let (_dir, backends) = temp_backends();
    let mut session = Session::new(backends).unwrap();
    let mut ctx = session.new_context(&Bindings::new()).unwrap();

    let err = ctx.call("nope", vec![]).await.expect_err("should fail");
    assert!(matches!(err, ScriptError::Execution(ref m) if m.contains("nope is not a function")));
}

#[tokio::test]
async fn test_console_goes_to_log() {
    let (_dir, backends) = temp_backends();
    let mut session = Session::new(backends).unwrap();
    let mut ctx = session.new_context(&Bindings::new()).unwrap();

    let result = ctx
        .run("console.log('hello', { a: 1 }); console.error('bad'); 'done'")
        .await
        .unwrap();
    assert_eq!(result, Value::from("done"));
}

#[test]
fn test_bindings_deserialize_from_config_names() {
    let bindings: Bindings = serde_json::from_str(r#"{"FS": "fs", "Data": "FS"}"#).unwrap();
    let collected: Vec<_> = bindings.iter().collect();
    assert_eq!(
        collected,
        vec![("Data", Capability::Fs), ("FS", Capability::Fs)]
    );
}

#[tokio::test]
async fn test_dispose_releases_the_session() {
    let (_dir, backends) = temp_backends();
    let session = Session::new(backends.clone()).unwrap();
    session.dispose();

    let mut again = Session::new(backends).unwrap();
    let mut ctx = again.new_context(&Bindings::new()).unwrap();
    assert_eq!(ctx.run("1 + 1").await.unwrap(), Value::Int(2));
}
