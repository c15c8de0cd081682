use rand::RngCore;
use time::OffsetDateTime;

pub const DEFAULT_PREFIX: &str = "PAR";

/// Mints a `PREFIX-YYYYMMDD-XXXXXX` tracking id: the current UTC date
/// followed by three bytes of OS randomness in uppercase hex. Uniqueness
/// is probabilistic, there is no collision check against stored parcels.
pub fn generate() -> String {
    generate_with_prefix(DEFAULT_PREFIX)
}

pub fn generate_with_prefix(prefix: &str) -> String {
    let date = OffsetDateTime::now_utc().date();

    let mut suffix = [0u8; 3];
    rand::rngs::OsRng.fill_bytes(&mut suffix);

    format!(
        "{}-{:04}{:02}{:02}-{}",
        prefix,
        date.year(),
        u8::from(date.month()),
        date.day(),
        hex::encode_upper(suffix),
    )
}
