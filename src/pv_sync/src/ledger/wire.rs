//! PVOutput text wire format.
//!
//! `getoutput.jsp` answers with records separated by `;`, fields by `,`, in this
//! order: date, generated, efficiency, exported, used, peak power, peak time,
//! condition, min temp, max temp, peak import, off-peak import, shoulder import,
//! high-shoulder import, insolation. Unknown values are `NaN`.
//!
//! `addoutput.jsp` takes form fields `d` (yyyymmdd), `e` (exported), `ip`, `io`,
//! `is`, `ih` (import buckets) and `c` (consumption).

use chrono::NaiveDate;

use crate::ledger::{DailyLedgerRecord, LedgerError, LedgerUpdate};

const DATE_FORMAT: &str = "%Y%m%d";

const F_DATE: usize = 0;
const F_GENERATED: usize = 1;
const F_EXPORTED: usize = 3;
const F_USED: usize = 4;
const F_IMPORT_PEAK: usize = 10;
const F_IMPORT_OFF_PEAK: usize = 11;
const F_IMPORT_SHOULDER: usize = 12;
const F_IMPORT_HIGH_SHOULDER: usize = 13;

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(s: &str) -> Result<NaiveDate, LedgerError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|e| LedgerError::Malformed(format!("bad date {s:?}: {e}")))
}

/// Energy field: `NaN`, empty or absent is unknown.
fn energy(fields: &[&str], idx: usize) -> Result<Option<u64>, LedgerError> {
    let Some(raw) = fields.get(idx).map(|s| s.trim()) else {
        return Ok(None);
    };
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    let v: f64 = raw
        .parse()
        .map_err(|_| LedgerError::Malformed(format!("bad energy value {raw:?}")))?;
    if !v.is_finite() || v < 0.0 {
        return Ok(None);
    }
    Ok(Some(v.round() as u64))
}

fn parse_record(line: &str) -> Result<DailyLedgerRecord, LedgerError> {
    let fields: Vec<&str> = line.split(',').collect();
    let date = parse_date(fields[F_DATE])?;
    Ok(DailyLedgerRecord {
        date,
        generated: energy(&fields, F_GENERATED)?,
        exported: energy(&fields, F_EXPORTED)?,
        consumption: energy(&fields, F_USED)?,
        import_peak: energy(&fields, F_IMPORT_PEAK)?,
        import_off_peak: energy(&fields, F_IMPORT_OFF_PEAK)?,
        import_shoulder: energy(&fields, F_IMPORT_SHOULDER)?,
        import_high_shoulder: energy(&fields, F_IMPORT_HIGH_SHOULDER)?,
    })
}

/// Parse a `getoutput.jsp` body, keeping the service's order (most recent first).
pub fn parse_outputs(body: &str) -> Result<Vec<DailyLedgerRecord>, LedgerError> {
    body.trim()
        .split(';')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(parse_record)
        .collect()
}

/// Form fields for `addoutput.jsp`.
pub fn output_form(update: &LedgerUpdate) -> Vec<(&'static str, String)> {
    let mut form = vec![
        ("d", format_date(update.date)),
        ("e", update.exported.to_string()),
        ("ip", update.import.peak.to_string()),
        ("io", update.import.off_peak.to_string()),
        ("is", update.import.shoulder.to_string()),
        ("ih", update.import.high_shoulder.to_string()),
    ];
    if let Some(c) = update.consumption {
        form.push(("c", c.to_string()));
    }
    form
}
