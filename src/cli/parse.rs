use crate::classifier::{Classification, Classifier};
use crate::error::Result;
use crate::patterns::Registry;
use crate::settings::load_settings;
use crate::sink::MemorySink;

pub fn run(text: &str, date: Option<String>) -> Result<()> {
    let settings = load_settings();
    let classifier = Classifier::new(Registry::builtin(), settings.tz()?);
    let date = date.unwrap_or_else(|| chrono::Utc::now().timestamp_millis().to_string());

    // Nothing is written to the dead-letter log for one-off checks.
    let mut sink = MemorySink::new();
    match classifier.classify_raw(text, &date, &mut sink)? {
        Classification::Record(record) => {
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Classification::Dropped(kind) => println!("dropped ({kind})"),
        Classification::Unrecognized => println!("unrecognized"),
        Classification::MalformedTimestamp => println!("unrecognized (bad date {date:?})"),
    }
    Ok(())
}
