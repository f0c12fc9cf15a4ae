use lognoise::multiline::MultiLineAggregator;

fn collect(lines: &[&str]) -> Vec<String> {
    let mut agg = MultiLineAggregator::default();
    let mut out = Vec::new();
    for l in lines {
        if let Some(e) = agg.push(l) {
            out.push(e);
        }
    }
    if let Some(e) = agg.finish() {
        out.push(e);
    }
    out
}

#[test]
fn plain_lines_stay_separate() {
    let out = collect(&["Error: Connection failed", "Info: User logged in", "", "Warning: Disk space low"]);
    assert_eq!(out, vec!["Error: Connection failed", "Info: User logged in", "Warning: Disk space low"]);
}

#[test]
fn consolidates_stack_trace_into_single_entry() {
    let out = collect(&[
        "2023-01-01 10:00:00 java.lang.RuntimeException: boom",
        "\tat com.example.Main.method(Main.java:10)",
        "Caused by: java.io.IOException: no disk",
        "\t... 3 more",
        "2023-01-01 10:00:01 Info: recovered",
    ]);
    assert_eq!(out.len(), 2);
    assert!(out[0].contains("com.example.Main.method"));
    assert!(out[0].contains("Caused by"));
    assert_eq!(out[1], "2023-01-01 10:00:01 Info: recovered");
}

#[test]
fn consolidates_multiline_json() {
    let out = collect(&["{", "  \"msg\": \"disk low\",", "  \"code\": 7", "}", "next line"]);
    assert_eq!(out.len(), 2);
    assert!(out[0].contains("\"msg\": \"disk low\""));
    let table = lognoise::LogTable::from_json_lines(&out);
    assert_eq!(table.column("msg").unwrap()[0], "disk low");
}

#[test]
fn single_line_json_is_never_extended() {
    let out = collect(&[r#"{"msg":"disk low"}"#, "    extra detail", r#"{"msg":"disk low"}"#]);
    assert_eq!(out, vec![r#"{"msg":"disk low"}"#, "    extra detail", r#"{"msg":"disk low"}"#]);
    let table = lognoise::LogTable::from_json_lines(&out);
    let with_msg = table.column("msg").unwrap().into_iter().filter(|v| !v.is_null()).count();
    assert_eq!(with_msg, 2);
}

#[test]
fn stack_trace_after_json_record_starts_fresh() {
    let out = collect(&[r#"{"level":"error"}"#, "Caused by: boom", "\tat a.b(C.java:1)"]);
    assert_eq!(out.len(), 2);
    assert_eq!(out[1], "Caused by: boom\n\tat a.b(C.java:1)");
}
