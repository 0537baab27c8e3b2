use std::collections::BTreeMap;

use chrono::Utc;
use chrono_tz::Tz;
use serde_json::{json, Value};
use tracing::field::{Field, Visit};
use tracing::level_filters::LevelFilter;
use tracing::Metadata;
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// Prints every event as one line, either plain text or a flat JSON object.
pub struct ServeLayer {
    pub app: String,
    pub log_type: String,
    pub log_format: String,
    pub tz: String,
    pub level: Option<String>,
}

impl ServeLayer {
    fn level_filter(&self) -> Option<LevelFilter> {
        match self.level.as_deref()?.to_lowercase().as_str() {
            "trace" => Some(LevelFilter::TRACE),
            "debug" => Some(LevelFilter::DEBUG),
            "info" => Some(LevelFilter::INFO),
            "warn" => Some(LevelFilter::WARN),
            "error" => Some(LevelFilter::ERROR),
            _ => None,
        }
    }

    fn timestamp(&self) -> String {
        let tz: Tz = self.tz.parse().unwrap_or(Tz::UTC);
        Utc::now()
            .with_timezone(&tz)
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string()
    }

    fn render(
        &self,
        ts: &str,
        level: &str,
        caller: &str,
        mut fields: BTreeMap<String, Value>,
    ) -> String {
        let msg = match fields.remove("message") {
            Some(Value::String(msg)) => msg,
            Some(other) => other.to_string(),
            None => "".to_string(),
        };
        if self.log_format == "json" {
            json!({
                "_TS_": ts,
                "_MSM_": msg,
                "_LEVEL_": level,
                "_CALLER_": caller,
                "_FIELDS_": fields,
                "_APP_": self.app,
                "_TYPE_": self.log_type,
            })
            .to_string()
        } else if fields.is_empty() {
            format!("{} [{}] {} -- {}", ts, level, msg, caller)
        } else {
            let fields = fields
                .iter()
                .map(|(key, value)| format!("{}={}", key, value))
                .collect::<Vec<_>>()
                .join(" ");
            format!("{} [{}] {} {} -- {}", ts, level, msg, fields, caller)
        }
    }
}

impl<S> Layer<S> for ServeLayer
where
    S: tracing::Subscriber,
{
    fn enabled(&self, metadata: &Metadata<'_>, _ctx: Context<'_, S>) -> bool {
        match self.level_filter() {
            Some(filter) => filter >= *metadata.level(),
            None => true,
        }
    }

    fn max_level_hint(&self) -> Option<LevelFilter> {
        self.level_filter()
    }

    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = BTreeMap::new();
        let mut visitor = FieldVisitor(&mut fields);
        event.record(&mut visitor);

        let line = self.render(
            &self.timestamp(),
            event.metadata().level().as_str(),
            event.metadata().target(),
            fields,
        );
        println!("{}", line);
    }
}

/// Collects event fields as JSON values keyed by field name.
struct FieldVisitor<'a>(&'a mut BTreeMap<String, Value>);

impl FieldVisitor<'_> {
    fn put(&mut self, field: &Field, value: Value) {
        self.0.insert(field.name().to_string(), value);
    }
}

impl Visit for FieldVisitor<'_> {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.put(field, json!(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, json!(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, json!(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, json!(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, json!(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.put(field, json!(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.put(field, json!(format!("{:?}", value)));
    }
}
