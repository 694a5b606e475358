//! Date and identifier helpers.

use chrono::{Local, NaiveDate};

/// Current Unix time in seconds.
pub fn current_timestamp() -> u64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.map(|d| d.as_secs())
		.unwrap_or(0)
}

/// Current Unix time in milliseconds.
pub fn current_timestamp_millis() -> u128 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.map(|d| d.as_millis())
		.unwrap_or(0)
}

/// Today's date in the local time zone. Orders carry plain dates, not instants.
pub fn today() -> NaiveDate {
	Local::now().date_naive()
}

/// Shortens an identifier for log output.
pub fn truncate_id(id: &str) -> String {
	if id.chars().count() <= 8 {
		id.to_string()
	} else {
		let head: String = id.chars().take(8).collect();
		format!("{}..", head)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_truncate_id() {
		assert_eq!(truncate_id("c-101"), "c-101");
		assert_eq!(truncate_id("c-1698200000000-a1b2c3"), "c-169820..");
		assert_eq!(truncate_id("訂單編號一二三四五"), "訂單編號一二三四..");
	}

	#[test]
	fn test_timestamps_are_consistent() {
		let secs = current_timestamp();
		let millis = current_timestamp_millis();
		assert!(millis / 1000 >= secs as u128);
	}
}
