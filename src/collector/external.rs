//! Sources backed by external programs.

use std::net::IpAddr;

use crate::collector::procfs::CollectError;
use crate::collector::procfs::parser::{parse_entity_listing, parse_ip_addresses, parse_lscpu};
use crate::collector::traits::CommandRunner;
use crate::config::CommandSpec;

fn run(runner: &dyn CommandRunner, spec: &CommandSpec) -> Result<Vec<u8>, CollectError> {
    runner
        .run(&spec.program, &spec.args)
        .map_err(|e| CollectError::unavailable(spec.display(), e))
}

/// Lists entity names (disks, interfaces) from the first column of a
/// command's tabular output.
pub fn enumerate_entities(
    runner: &dyn CommandRunner,
    spec: &CommandSpec,
) -> Result<Vec<String>, CollectError> {
    let stdout = run(runner, spec)?;
    Ok(parse_entity_listing(
        &String::from_utf8_lossy(&stdout),
        spec.skip_header,
    ))
}

/// Runs a command whose stdout is already JSON and returns it untouched.
pub fn raw_json_blob(
    runner: &dyn CommandRunner,
    spec: &CommandSpec,
) -> Result<Vec<u8>, CollectError> {
    let stdout = run(runner, spec)?;
    if stdout.trim_ascii().is_empty() {
        return Err(CollectError::Parse(format!(
            "{} produced no output",
            spec.program
        )));
    }
    Ok(stdout)
}

/// Runs `lscpu` and keeps the known fields.
pub fn collect_lscpu(
    runner: &dyn CommandRunner,
    spec: &CommandSpec,
) -> Result<Vec<(&'static str, String)>, CollectError> {
    let stdout = run(runner, spec)?;
    Ok(parse_lscpu(&String::from_utf8_lossy(&stdout)))
}

/// Lists interface addresses from `ip -brief address` style output.
pub fn collect_addresses(
    runner: &dyn CommandRunner,
    spec: &CommandSpec,
) -> Result<Vec<(String, IpAddr)>, CollectError> {
    let stdout = run(runner, spec)?;
    Ok(parse_ip_addresses(&String::from_utf8_lossy(&stdout)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockCommands;
    use crate::config::SamplerConfig;

    #[test]
    fn test_enumerate_disks_skips_header() {
        let commands = MockCommands::typical_system();
        let config = SamplerConfig::default();

        let names = enumerate_entities(&commands, &config.disk_discovery).unwrap();
        assert_eq!(names, vec!["sda", "sdb", "loop0"]);
    }

    #[test]
    fn test_enumerate_interfaces() {
        let commands = MockCommands::typical_system();
        let config = SamplerConfig::default();

        let names = enumerate_entities(&commands, &config.net_discovery).unwrap();
        assert_eq!(names, vec!["lo", "eth0", "veth1a2b"]);
    }

    #[test]
    fn test_missing_command_is_unavailable() {
        let commands = MockCommands::new();
        let config = SamplerConfig::default();

        let err = enumerate_entities(&commands, &config.disk_discovery).unwrap_err();
        assert!(matches!(err, CollectError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_raw_json_blob() {
        let mut commands = MockCommands::new();
        commands.add_output("lshw", "{\"id\": \"host\"}\n");
        let config = SamplerConfig::default();

        let blob = raw_json_blob(&commands, &config.lshw).unwrap();
        assert_eq!(blob, b"{\"id\": \"host\"}\n");

        commands.add_output("lshw", "  \n");
        assert!(matches!(
            raw_json_blob(&commands, &config.lshw),
            Err(CollectError::Parse(_))
        ));
    }

    #[test]
    fn test_collect_lscpu() {
        let commands = MockCommands::typical_system();
        let config = SamplerConfig::default();

        let fields = collect_lscpu(&commands, &config.lscpu).unwrap();
        assert_eq!(fields[0], ("architecture", "x86_64".to_string()));
        assert!(fields.iter().any(|(k, v)| *k == "sockets" && v == "1"));
    }

    #[test]
    fn test_collect_addresses() {
        let commands = MockCommands::typical_system();
        let config = SamplerConfig::default();

        let addresses = collect_addresses(&commands, &config.addresses).unwrap();
        assert_eq!(addresses.len(), 5);
        assert_eq!(addresses[2], ("eth0".to_string(), "10.0.0.5".parse().unwrap()));
        assert_eq!(commands.calls(), vec!["ip -brief address".to_string()]);
    }
}
