//! Where `print` sends its values

use std::io::{self, Write};

/// Receiver of the values popped by `print`
pub trait PrintSink {
    fn emit(&mut self, value: f64) -> io::Result<()>;
}

/// Collects values in memory
impl PrintSink for Vec<f64> {
    fn emit(&mut self, value: f64) -> io::Result<()> {
        self.push(value);
        Ok(())
    }
}

/// Writes each value on its own tab-indented line
pub struct WriterSink<W> {
    writer: W,
    precision: usize,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W, precision: usize) -> Self {
        Self { writer, precision }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl WriterSink<io::Stdout> {
    pub fn stdout(precision: usize) -> Self {
        Self::new(io::stdout(), precision)
    }
}

impl<W: Write> PrintSink for WriterSink<W> {
    fn emit(&mut self, value: f64) -> io::Result<()> {
        writeln!(self.writer, "\t{}", format_number(value, self.precision))?;
        self.writer.flush()
    }
}

/// Format like C's `%.<precision>g`
pub fn format_number(value: f64, precision: usize) -> String {
    let precision = precision.max(1);
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    // The exponent has to be taken after rounding to `precision` digits.
    let scientific = format!("{:.*e}", precision - 1, value);
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= precision as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_fraction(mantissa), exponent.unsigned_abs())
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
