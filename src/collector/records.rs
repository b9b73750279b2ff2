//! Counter views of raw records.
//!
//! Maps parsed `/proc` records onto the field names emitted in the stream,
//! applying unit conversions before rates are taken.

use crate::collector::procfs::parser::{DiskStats, NetDevStats};
use crate::sampler::CounterRecord;

impl DiskStats {
    pub fn read_kb(&self) -> u64 {
        self.read_sectors / 2
    }

    pub fn write_kb(&self) -> u64 {
        self.write_sectors / 2
    }

    pub fn transfers(&self) -> u64 {
        self.reads + self.writes
    }

    /// Average transfer size in bytes, 0 with no transfers.
    pub fn block_size(&self) -> u64 {
        let xfers = self.transfers();
        if xfers == 0 {
            return 0;
        }
        ((self.read_kb() + self.write_kb()) / xfers) * 1024
    }

    /// Gauges reported next to the rates.
    pub fn gauges(&self) -> Vec<(&'static str, u64)> {
        vec![
            ("inflight", self.io_in_progress),
            ("bsize", self.block_size()),
        ]
    }
}

impl CounterRecord for DiskStats {
    fn counters(&self) -> Vec<(&'static str, u64)> {
        vec![
            ("reads", self.reads),
            ("rmerge", self.r_merged),
            ("rkb", self.read_kb()),
            ("rmsec", self.read_time),
            ("writes", self.writes),
            ("wmerge", self.w_merged),
            ("wkb", self.write_kb()),
            ("wmsec", self.write_time),
            // io ticks in ms; a tenth per second reads as percent busy
            ("time", self.io_time / 10),
            ("backlog", self.io_weighted_time),
            ("xfers", self.transfers()),
        ]
    }
}

impl CounterRecord for NetDevStats {
    fn counters(&self) -> Vec<(&'static str, u64)> {
        vec![
            ("ibytes", self.rx_bytes),
            ("ipackets", self.rx_packets),
            ("ierrs", self.rx_errs),
            ("idrop", self.rx_drop),
            ("ififo", self.rx_fifo),
            ("iframe", self.rx_frame),
            ("obytes", self.tx_bytes),
            ("opackets", self.tx_packets),
            ("oerrs", self.tx_errs),
            ("odrop", self.tx_drop),
            ("ofifo", self.tx_fifo),
            ("ocolls", self.tx_colls),
            ("ocarrier", self.tx_carrier),
        ]
    }
}

/// Scalar `/proc/stat` counters turned into rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatCounter {
    ContextSwitches,
    Forks,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disk_unit_conversions() {
        let disk = DiskStats {
            device: "sda".to_string(),
            reads: 10,
            read_sectors: 200,
            writes: 10,
            write_sectors: 200,
            io_time: 4500,
            io_in_progress: 3,
            ..Default::default()
        };

        assert_eq!(disk.read_kb(), 100);
        assert_eq!(disk.transfers(), 20);
        assert_eq!(disk.block_size(), 10 * 1024);

        let counters = disk.counters();
        assert!(counters.contains(&("time", 450)));
        assert!(counters.contains(&("xfers", 20)));
        assert_eq!(disk.gauges(), vec![("inflight", 3), ("bsize", 10240)]);
    }

    #[test]
    fn test_idle_disk_block_size_is_zero() {
        let disk = DiskStats::default();
        assert_eq!(disk.block_size(), 0);
    }

    #[test]
    fn test_net_counter_order() {
        let net = NetDevStats {
            rx_bytes: 1,
            tx_carrier: 13,
            ..Default::default()
        };
        let counters = net.counters();
        assert_eq!(counters.len(), 13);
        assert_eq!(counters[0], ("ibytes", 1));
        assert_eq!(counters[12], ("ocarrier", 13));
    }
}
