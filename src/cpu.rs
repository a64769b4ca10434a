//! Host CPU information printed alongside benchmark results

use std::fmt;

/// What is known about the machine running the benchmark
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuInfo {
    pub os: &'static str,
    pub arch: &'static str,
    pub logical_cpus: usize,
    pub physical_cores: usize,
    pub vendor: Option<String>,
    pub model: Option<String>,
}

impl CpuInfo {
    pub fn detect() -> Self {
        let (vendor, model) = std::fs::read_to_string("/proc/cpuinfo")
            .map(|content| parse_cpuinfo(&content))
            .unwrap_or((None, None));

        Self {
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            logical_cpus: num_cpus::get(),
            physical_cores: num_cpus::get_physical(),
            vendor,
            model,
        }
    }
}

/// Vendor and model of the first processor listed in `/proc/cpuinfo`
fn parse_cpuinfo(content: &str) -> (Option<String>, Option<String>) {
    let mut vendor = None;
    let mut model = None;

    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        match key.trim() {
            "vendor_id" | "CPU implementer" if vendor.is_none() => {
                vendor = Some(value.to_string())
            }
            "model name" | "Model" if model.is_none() => model = Some(value.to_string()),
            _ => {}
        }

        if vendor.is_some() && model.is_some() {
            break;
        }
    }

    (vendor, model)
}

impl fmt::Display for CpuInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "OS     : {}", self.os)?;
        writeln!(f, "Arch   : {}", self.arch)?;
        writeln!(
            f,
            "CPUs   : {} (cores: {})",
            self.logical_cpus, self.physical_cores
        )?;
        if let Some(vendor) = &self.vendor {
            writeln!(f, "Vendor : {}", vendor)?;
        }
        if let Some(model) = &self.model {
            writeln!(f, "Model  : {}", model)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect() {
        let info = CpuInfo::detect();

        assert!(info.logical_cpus >= 1);
        assert!(info.physical_cores >= 1);
        assert!(!info.os.is_empty());
        assert!(!info.arch.is_empty());
    }

    #[test]
    fn test_parse_x86_cpuinfo() {
        let content = "processor\t: 0\n\
                       vendor_id\t: GenuineIntel\n\
                       cpu family\t: 6\n\
                       model\t\t: 158\n\
                       model name\t: Intel(R) Core(TM) i7-8700 CPU @ 3.20GHz\n\
                       \n\
                       processor\t: 1\n\
                       vendor_id\t: OtherVendor\n";

        let (vendor, model) = parse_cpuinfo(content);

        assert_eq!(vendor.as_deref(), Some("GenuineIntel"));
        assert_eq!(
            model.as_deref(),
            Some("Intel(R) Core(TM) i7-8700 CPU @ 3.20GHz")
        );
    }

    #[test]
    fn test_parse_empty_cpuinfo() {
        assert_eq!(parse_cpuinfo(""), (None, None));
    }

    #[test]
    fn test_display_skips_unknown_fields() {
        let info = CpuInfo {
            os: "linux",
            arch: "x86_64",
            logical_cpus: 8,
            physical_cores: 4,
            vendor: None,
            model: Some("Test CPU".to_string()),
        };

        let rendered = info.to_string();

        assert!(rendered.contains("CPUs   : 8 (cores: 4)"));
        assert!(rendered.contains("Model  : Test CPU"));
        assert!(!rendered.contains("Vendor"));
    }
}
