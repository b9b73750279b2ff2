//! Canned external command output for tests.

use crate::collector::traits::CommandRunner;
use std::collections::HashMap;
use std::io;
use std::sync::Mutex;

/// Command runner that answers from a fixed table.
///
/// An entry is keyed either by the full command line (`ip -brief address`)
/// or by the bare program name; the full line is looked up first. Commands
/// without an entry fail with `NotFound`, like a missing binary. Every
/// invocation is recorded as its full command line so tests can assert how
/// often discovery ran.
#[derive(Debug, Default)]
pub struct MockCommands {
    outputs: HashMap<String, Vec<u8>>,
    calls: Mutex<Vec<String>>,
}

impl MockCommands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the stdout returned for a program name or full command line.
    pub fn add_output(&mut self, command: impl Into<String>, stdout: impl Into<Vec<u8>>) {
        self.outputs.insert(command.into(), stdout.into());
    }

    /// Command lines invoked so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Discovery and inventory commands of a small server.
    ///
    /// Matches the devices in `MockFs::typical_system()`.
    pub fn typical_system() -> Self {
        let mut commands = Self::new();
        commands.add_output(
            "lsblk",
            "NAME TYPE\nsda disk\nsdb disk\nloop0 loop\n",
        );
        commands.add_output(
            "ip",
            "\
lo               UNKNOWN        00:00:00:00:00:00 <LOOPBACK,UP,LOWER_UP>
eth0             UP             52:54:00:12:34:56 <BROADCAST,MULTICAST,UP,LOWER_UP>
veth1a2b@if4     UP             aa:bb:cc:dd:ee:ff <BROADCAST,MULTICAST,UP,LOWER_UP>
",
        );
        commands.add_output(
            "ip -brief address",
            "\
lo               UNKNOWN        127.0.0.1/8 ::1/128
eth0             UP             10.0.0.5/24 fe80::5054:ff:fe12:3456/64
veth1a2b@if4     UP             fe80::a8bb:ccff:fedd:eeff/64
",
        );
        commands.add_output(
            "lscpu",
            "\
Architecture:            x86_64
Byte Order:              Little Endian
CPU(s):                  4
On-line CPU(s) list:     0-3
Vendor ID:               GenuineIntel
Model name:              Intel(R) Xeon(R) CPU @ 2.20GHz
Thread(s) per core:      2
Core(s) per socket:      2
Socket(s):               1
NUMA node(s):            1
",
        );
        commands.add_output(
            "lshw",
            "{\n  \"id\" : \"host\",\n  \"class\" : \"system\"\n}\n",
        );
        commands
    }
}

impl CommandRunner for MockCommands {
    fn run(&self, program: &str, args: &[String]) -> io::Result<Vec<u8>> {
        let line = std::iter::once(program)
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(line.clone());
        }
        self.outputs
            .get(&line)
            .or_else(|| self.outputs.get(program))
            .cloned()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("command not found: {}", line),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_program_returns_output() {
        let commands = MockCommands::typical_system();
        let out = commands.run("lsblk", &[]).unwrap();
        assert!(String::from_utf8_lossy(&out).starts_with("NAME TYPE"));
        assert_eq!(commands.calls(), vec!["lsblk".to_string()]);
    }

    #[test]
    fn test_full_command_line_wins() {
        let commands = MockCommands::typical_system();
        let args = |a: &[&str]| a.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        let link = commands.run("ip", &args(&["-brief", "link"])).unwrap();
        let address = commands.run("ip", &args(&["-brief", "address"])).unwrap();
        assert!(String::from_utf8_lossy(&link).contains("52:54:00:12:34:56"));
        assert!(String::from_utf8_lossy(&address).contains("10.0.0.5/24"));
        assert_eq!(
            commands.calls(),
            vec!["ip -brief link".to_string(), "ip -brief address".to_string()]
        );
    }

    #[test]
    fn test_unknown_program_fails() {
        let commands = MockCommands::new();
        let err = commands.run("lshw", &["-json".to_string()]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
