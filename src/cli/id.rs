//! t0 id command implementation

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::identity::{Identity, IdentityForm};
use crate::output::{emit_success, HumanOutput, OutputOptions};

pub struct NewOptions {
    pub long: bool,
    pub output: OutputOptions,
}

pub struct DecodeOptions {
    pub value: String,
    pub output: OutputOptions,
}

#[derive(Serialize)]
struct IdentityReport {
    short: String,
    long: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<DateTime<Utc>>,
}

impl From<Identity> for IdentityReport {
    fn from(identity: Identity) -> Self {
        Self {
            short: identity.encode_short(),
            long: identity.encode_long(),
            timestamp: identity.timestamp(),
        }
    }
}

pub fn run_new(options: NewOptions) -> Result<()> {
    let identity = Identity::new();
    let form = if options.long {
        IdentityForm::Long
    } else {
        IdentityForm::Short
    };

    if options.output.json {
        return emit_success(options.output, "id new", &IdentityReport::from(identity), None);
    }
    // The bare value is the output, even with --quiet.
    println!("{}", identity.encode(form));
    Ok(())
}

pub fn run_decode(options: DecodeOptions) -> Result<()> {
    let identity = Identity::decode(options.value.trim())?;
    let report = IdentityReport::from(identity);

    let mut human = HumanOutput::new(report.long.clone());
    human.push_summary("short", report.short.clone());
    human.push_summary("long", report.long.clone());
    if let Some(timestamp) = report.timestamp {
        human.push_summary("created", timestamp.to_rfc3339());
    }

    emit_success(options.output, "id decode", &report, Some(&human))
}
