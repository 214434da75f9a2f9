use chrono::NaiveDate;

/// This is the standard way of converting a date to a file name in screentime.
pub fn date_to_record_name(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
