use std::time::Duration;

/// Split a comma separated value, dropping empty items.
pub fn parse_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|part| {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

/// `"30s"`, `"1m 30s"`, `"250ms"`.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    humantime::parse_duration(raw.trim()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_drops_blank_items() {
        assert_eq!(
            parse_csv(" repartidor, ,repartidores ,"),
            ["repartidor", "repartidores"]
        );
        assert!(parse_csv("").is_empty());
    }

    #[test]
    fn durations_use_humantime() {
        assert_eq!(parse_duration("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("1m 30s"), Some(Duration::from_secs(90)));
        assert_eq!(parse_duration("soon"), None);
    }
}
