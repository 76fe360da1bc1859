//! System instruction for the command loop

use chrono::{DateTime, TimeZone};

/// Build the system instruction for one utterance
///
/// The current time is embedded so relative reminders ("tomorrow at nine")
/// resolve against the user's clock.
#[must_use]
pub fn system_instruction<Tz>(now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut prompt = String::from(
        "You are a helpful assistant for seniors. \
         Listen to the voice command and perform the requested action.\n",
    );

    prompt.push_str("- For weather: use 'get_weather'.\n");
    prompt.push_str(
        "- For calling a person: FIRST use 'search_contacts' to find their number by name. \
         If you find multiple numbers or none, inform the user. \
         If you find exactly one, proceed to use 'call_someone' with that number.\n",
    );
    prompt.push_str("- For calling a direct number: use 'call_someone' with the number.\n");
    prompt.push_str(&format!(
        "- For reminders: use 'set_reminder'. Ensure the 'dateIso' is valid ISO 8601. \
         Current time is {}.\n",
        now.format("%Y-%m-%dT%H:%M:%S%:z (%A)")
    ));

    prompt.push_str("\nKeep your final vocal response concise and friendly.");
    prompt
}
