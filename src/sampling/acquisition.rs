//! acquisition.rs
//! Value-acquisition capabilities: where a sensor's next `f64` comes from.
//!
//! - `FileSource`: re-opens a path on every read and parses the first numeric token
//!   (sysfs/hwmon style files such as `/sys/class/thermal/thermal_zone0/temp`).
//! - `SimulatedSource`: base value + uniform noise, for demos and tests.
//! - Any `FnMut() -> Result<f64, AcquisitionError>` closure.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::error::AcquisitionError;

/// Produces one sample per call. Failures must not have side effects on the caller.
pub trait Acquire: Send {
    fn acquire(&mut self) -> Result<f64, AcquisitionError>;

    /// Human-readable locator (path, device id) for logs.
    fn describe(&self) -> String {
        "<anonymous>".to_string()
    }
}

impl<F> Acquire for F
where
    F: FnMut() -> Result<f64, AcquisitionError> + Send,
{
    fn acquire(&mut self) -> Result<f64, AcquisitionError> {
        self()
    }
}

/// Reads a single numeric token from a file on each call.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    scale: f64,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), scale: 1.0 }
    }

    /// Multiplies every parsed value, e.g. `0.001` for millidegree hwmon files.
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Acquire for FileSource {
    fn acquire(&mut self) -> Result<f64, AcquisitionError> {
        let text = fs::read_to_string(&self.path).map_err(|source| AcquisitionError::Open {
            path: self.path.clone(),
            source,
        })?;
        let value = parse_first_token(&text, &self.path)? * self.scale;
        if !value.is_finite() {
            return Err(AcquisitionError::NonFinite(value));
        }
        Ok(value)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

fn parse_first_token(text: &str, path: &Path) -> Result<f64, AcquisitionError> {
    let token = text
        .split_whitespace()
        .next()
        .ok_or_else(|| AcquisitionError::Empty { path: path.to_path_buf() })?;
    token.parse::<f64>().map_err(|_| AcquisitionError::Parse {
        path: path.to_path_buf(),
        token: token.to_string(),
    })
}

/// Seeded noise generator around a base value.
pub struct SimulatedSource {
    rng: StdRng,
    base: f64,
    noise: f64,
    name: String,
}

impl SimulatedSource {
    pub fn new(name: &str, base: f64, noise: f64, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            base,
            noise: noise.abs(),
            name: name.to_string(),
        }
    }
}

impl fmt::Debug for SimulatedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatedSource")
            .field("name", &self.name)
            .field("base", &self.base)
            .field("noise", &self.noise)
            .finish()
    }
}

impl Acquire for SimulatedSource {
    fn acquire(&mut self) -> Result<f64, AcquisitionError> {
        if self.noise == 0.0 {
            return Ok(self.base);
        }
        Ok(self.base + self.rng.random_range(-self.noise..self.noise))
    }

    fn describe(&self) -> String {
        format!("simulated:{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn file_source_reads_first_token() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  42.5 trailing garbage").unwrap();
        let mut src = FileSource::new(file.path());
        assert_eq!(src.acquire().unwrap(), 42.5);
    }

    #[test]
    fn file_source_rereads_on_each_call() {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), "1\n").unwrap();
        let mut src = FileSource::new(file.path());
        assert_eq!(src.acquire().unwrap(), 1.0);
        fs::write(file.path(), "2\n").unwrap();
        assert_eq!(src.acquire().unwrap(), 2.0);
    }

    #[test]
    fn file_source_applies_scale() {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), "45000").unwrap();
        let mut src = FileSource::new(file.path()).with_scale(0.001);
        assert!((src.acquire().unwrap() - 45.0).abs() < 1e-9);
    }

    #[test]
    fn missing_file_is_open_error() {
        let mut src = FileSource::new("/nonexistent/rts_sampler/sensor");
        assert!(matches!(src.acquire(), Err(AcquisitionError::Open { .. })));
    }

    #[test]
    fn empty_and_garbage_files_fail() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut src = FileSource::new(file.path());
        assert!(matches!(src.acquire(), Err(AcquisitionError::Empty { .. })));

        fs::write(file.path(), "abc").unwrap();
        match src.acquire() {
            Err(AcquisitionError::Parse { token, .. }) => assert_eq!(token, "abc"),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn non_finite_values_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), "NaN").unwrap();
        let mut src = FileSource::new(file.path());
        assert!(matches!(src.acquire(), Err(AcquisitionError::NonFinite(_))));
    }

    #[test]
    fn simulated_source_stays_in_band() {
        let mut src = SimulatedSource::new("temp", 25.0, 0.5, 7);
        for _ in 0..1000 {
            let v = src.acquire().unwrap();
            assert!((24.5..25.5).contains(&v));
        }
    }

    #[test]
    fn closures_are_acquirers() {
        let mut n = 0.0;
        let mut f = move || -> Result<f64, AcquisitionError> {
            n += 1.0;
            Ok(n)
        };
        assert_eq!(Acquire::acquire(&mut f).unwrap(), 1.0);
        assert_eq!(Acquire::acquire(&mut f).unwrap(), 2.0);
    }
}
