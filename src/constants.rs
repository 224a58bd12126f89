/// Feed name constants to ensure consistency across the codebase
pub const MALWARE_FEED: &str = "malware";
pub const PHISHING_FEED: &str = "phishing";
pub const SPAM_FEED: &str = "spam";
pub const BENIGN_FEED: &str = "benign";

// Default source file names in the raw bucket
pub const MALWARE_FILE: &str = "CSV_malware.csv";
pub const PHISHING_FILE: &str = "CSV_phishing.csv";
pub const SPAM_FILE: &str = "CSV_spam.csv";
pub const BENIGN_FILE: &str = "CSV_benign.csv";

/// Prefix for persisted tables: `processed_<original file name>`
pub const PROCESSED_PREFIX: &str = "processed_";

pub const DEFAULT_RAW_DIR: &str = "data/raw";
pub const DEFAULT_PROCESSED_DIR: &str = "data/processed";

// Column names the coercer and realigner know about
pub const CREATION_DATE_TIME: &str = "Creation_Date_Time";
pub const DOMAIN_AGE: &str = "Domain_Age";
pub const DOMAIN_NAME: &str = "Domain_Name";
pub const NUMERIC_PERCENTAGE: &str = "numeric_percentage";
pub const EMAILS: &str = "Emails";
pub const BIGRAM: &str = "2gram";
pub const ENTROPY: &str = "entropy";

/// Pattern used for creation timestamps in every feed
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Destination name for a processed feed file
pub fn processed_name(file_name: &str) -> String {
    format!("{}{}", PROCESSED_PREFIX, file_name)
}
