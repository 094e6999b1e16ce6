//! End-to-end grouping scenarios.

use nested_groupby::assertion::{and, cmp, not};
use nested_groupby::{GroupKey, PipelineError, Stage, from};
use serde_json::{Value, json};
use std::io::{self, Write};
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

fn traffic() -> Vec<Value> {
    vec![
        json!({"date": "2017-07-01", "pv": 2246, "uv": 1345, "weekday": "sat"}),
        json!({"date": "2017-07-02", "pv": 5730, "uv": 2550, "weekday": "sun"}),
        json!({"date": "2017-07-03", "pv": 4567, "uv": 3656, "weekday": "mon"}),
        json!({"date": "2017-07-04", "pv": 4679, "uv": 2366, "weekday": "tue"}),
        json!({"date": "2017-07-05", "pv": 2904, "uv": 4832, "weekday": "wed"}),
        json!({"date": "2017-07-08", "pv": 3120, "uv": 1999, "weekday": "sat"}),
    ]
}

fn is_weekend(day: &Value) -> GroupKey {
    GroupKey::Bool(matches!(day.as_str(), Some("sat" | "sun")))
}

#[test]
fn test_weekend_split_with_per_group_rows() {
    let mut report = Vec::new();
    from(traffic())
        .classify_at("weekday", |day, _, _| is_weekend(day))
        .sum("pv")
        .before_each(|g| {
            let total = g.group.value.clone().unwrap_or_default();
            report.push(format!("{} total={total}", g.group.key));
            ControlFlow::Continue(())
        })
        .derive()
        .classify_by("date")
        .execute()
        .unwrap();
    assert_eq!(report, vec!["true total=11096", "false total=12150"]);
}

#[test]
fn test_where_expression_filters_before_grouping() {
    let mut kept = Vec::new();
    from(traffic())
        .filter_where(and([
            json!(true),
            cmp("pv", ">=", 3000),
            cmp("uv", ">=", 2000),
            not(cmp("date", ">", "2017-07-03")),
        ]))
        .classify_by("date")
        .after_all(|level| kept = level.keys.to_vec())
        .execute()
        .unwrap();
    assert_eq!(kept, vec![GroupKey::from("2017-07-02"), GroupKey::from("2017-07-03")]);
}

#[test]
fn test_transform_visible_to_every_hook() {
    let mut all_indexed = true;
    let mut groups = 0;
    from(traffic())
        .transform(|mut datum, i, _| {
            datum["index"] = json!(i);
            datum
        })
        .before_each(|g| {
            groups += 1;
            all_indexed &= g.group.members[0].get("index").is_some();
            ControlFlow::Continue(())
        })
        .execute()
        .unwrap();
    assert_eq!(groups, 6);
    assert!(all_indexed);
}

#[test]
fn test_top_group_only() {
    let mut visited = Vec::new();
    from(traffic())
        .classify_by("weekday")
        .count()
        .sort(|a, b| {
            b.value_f64()
                .partial_cmp(&a.value_f64())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .after_each(|_| ControlFlow::Break(()))
        .derive()
        .before_all(|level| visited.push(level.keys.len()))
        .execute()
        .unwrap();
    // only the "sat" group (two records) is descended into
    assert_eq!(visited, vec![2]);
}

#[test]
fn test_avg_uses_literal_formula() {
    let mut values = Vec::new();
    from(traffic())
        .classify_at("weekday", |day, _, _| is_weekend(day))
        .avg("pv")
        .after_all(|level| values = level.ordered().map(|g| g.value_f64()).collect())
        .execute()
        .unwrap();
    // weekend: idx 0 -> (0*2246+0)/1 = 0; idx 1 -> (0*5730+1)/2 = 0.5;
    //          idx 5 -> (0.5*3120+5)/6 = 260.8333..
    // weekday: idx 2 -> (0*4567+2)/3 = 0.666..; idx 3 -> (0.666..*4679+3)/4;
    //          idx 4 -> (prev*2904+4)/5
    let weekday = {
        let v2 = 2.0 / 3.0;
        let v3 = (v2 * 4679.0 + 3.0) / 4.0;
        (v3 * 2904.0 + 4.0) / 5.0
    };
    assert_eq!(values.len(), 2);
    assert!((values[0].unwrap() - (0.5 * 3120.0 + 5.0) / 6.0).abs() < 1e-9);
    assert!((values[1].unwrap() - weekday).abs() < 1e-6);
}

#[test]
fn test_invalid_where_surfaces_from_execute() {
    let mut stage: Stage<'_> = from(traffic()).filter_where(json!({"maybe": true}));
    let err = stage.execute().unwrap_err();
    assert!(matches!(err, PipelineError::InvalidExpression { .. }));
    assert_eq!(err.to_string(), r#"invalid expression: {"maybe":true}"#);
}

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Capture {
    type Writer = Capture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[test]
fn test_export_collision_logs_warning() {
    let capture = Capture::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(capture.clone())
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .finish();

    let shared = tracing::subscriber::with_default(subscriber, || {
        from(traffic())
            .classify_by("weekday")
            .export_group_keys_as("keys")
            .derive()
            .export_group_keys_as("keys")
            .execute()
            .unwrap()
    });

    assert_eq!(shared.group_keys("keys").map(<[_]>::len), Some(5));
    let logs = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
    // one collision per child invocation
    assert_eq!(logs.matches("WARN").count(), 5);
    assert!(logs.contains("export skipped"));
}
