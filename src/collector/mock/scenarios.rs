//! Pre-built mock filesystem scenarios for testing.
//!
//! `typical_system` and `after_one_second` form a pair: the second carries
//! the same machine one second later, with known counter increments.

use super::filesystem::MockFs;
use crate::collector::traits::FsUsage;

const NET_DEV_HEADER: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
";

impl MockFs {
    /// Creates a typical 4-CPU server.
    ///
    /// Disks: sda, sda1 (old-style partition line), sdb, loop0.
    /// Interfaces: lo, eth0, veth1a2b.
    /// Mounted: `/dev/sda1` on `/` (75% full), `/dev/sdb1` on `/data` (empty).
    /// Runs as `statstream` (uid 998).
    pub fn typical_system() -> Self {
        let mut fs = Self::new();

        fs.add_file("/proc/sys/kernel/hostname", "db01.example.com\n");
        fs.add_file("/sys/devices/virtual/dmi/id/product_serial", "SN-0042\n");
        fs.add_file("/sys/devices/virtual/dmi/id/product_name", "ProLiant DL360\n");
        fs.add_file("/sys/devices/virtual/dmi/id/sys_vendor", "HPE\n");
        fs.add_file(
            "/etc/os-release",
            "\
NAME=\"Debian GNU/Linux\"
VERSION_ID=\"12\"
VERSION=\"12 (bookworm)\"
PRETTY_NAME=\"Debian GNU/Linux 12 (bookworm)\"
ID=debian
",
        );
        fs.add_file(
            "/proc/version",
            "Linux version 6.1.0-18-amd64 (debian-kernel@lists.debian.org) #1 SMP PREEMPT_DYNAMIC\n",
        );

        let mut cpuinfo = String::new();
        for cpu in 0..4 {
            cpuinfo.push_str(&format!(
                "\
processor\t: {cpu}
vendor_id\t: GenuineIntel
model name\t: Intel(R) Xeon(R) CPU @ 2.20GHz
cpu MHz\t\t: 2200.000
cache size\t: 56320 KB
physical id\t: 0
siblings\t: 4
core id\t\t: {core}
cpu cores\t: 2

",
                core = cpu / 2
            ));
        }
        fs.add_file("/proc/cpuinfo", cpuinfo);

        fs.add_file("/proc/uptime", "200000.53 790000.10\n");
        fs.add_file("/proc/loadavg", "0.15 0.10 0.05 1/150 1234\n");
        fs.add_file(
            "/proc/meminfo",
            "\
MemTotal:       16384000 kB
MemFree:         8192000 kB
MemAvailable:   12000000 kB
Buffers:          512000 kB
Cached:          2048000 kB
Active(anon):    1024000 kB
SwapTotal:       4096000 kB
SwapFree:        4096000 kB
",
        );
        fs.add_file(
            "/proc/vmstat",
            "\
pgpgin 123456
pgpgout 654321
pswpin 100
pswpout 200
pgfault 999999
pgmajfault 1234
",
        );
        fs.add_file(
            "/proc/stat",
            "\
cpu  10000 500 3000 80000 1000 200 100 0 0 0
cpu0 2500 125 750 20000 250 50 25 0 0 0
cpu1 2500 125 750 20000 250 50 25 0 0 0
cpu2 2500 125 750 20000 250 50 25 0 0 0
cpu3 2500 125 750 20000 250 50 25 0 0 0
intr 1000000 50 0 0 0 0 0 0 0 1 0 0 0 100 0 0 1000
ctxt 500000
btime 1700000000
processes 10000
procs_running 2
procs_blocked 0
",
        );
        fs.add_file(
            "/proc/diskstats",
            "\
   8       0 sda 12345 100 987654 5000 6789 50 456789 3000 0 4000 8000 0 0 0 0
   8       1 sda1 10000 800000 5000 400000
   8      16 sdb 100 0 2000 10 50 0 1000 5 0 20 30
   7       0 loop0 50 0 400 1 0 0 0 0 0 1 1
",
        );
        fs.add_file(
            "/proc/net/dev",
            format!(
                "{NET_DEV_HEADER}\
    lo: 12345678     9876    0    0    0     0          0         0 12345678     9876    0    0    0     0       0          0
  eth0: 987654321   654321    5   10    0     0          0       100 123456789   456789    2    5    0     0       0          0
veth1a2b: 1000 10 0 0 0 0 0 0 2000 20 0 0 0 0 0 0
"
            ),
        );

        fs.add_file(
            "/etc/hosts",
            "\
127.0.0.1\tlocalhost
10.0.0.5\tdb01.example.com db01
",
        );
        fs.add_file(
            "/etc/passwd",
            "\
root:x:0:0:root:/root:/bin/bash
statstream:x:998:998::/var/lib/statstream:/usr/sbin/nologin
",
        );
        fs.add_file(
            "/proc/self/status",
            "Name:\tstatstreamd\nUid:\t998\t998\t998\t998\nGid:\t998\t998\t998\t998\n",
        );
        fs.add_file(
            "/etc/mtab",
            "\
/dev/sda1 / ext4 rw,relatime 0 1
proc /proc proc rw,nosuid,nodev,noexec,relatime 0 0
/dev/sdb1 /data xfs rw,noatime 0 2
/dev/loop0 /snap/core/1 squashfs ro 0 0
tmpfs /run tmpfs rw,nosuid,nodev 0 0
",
        );
        fs.add_usage(
            "/",
            FsUsage {
                block_size: 4096,
                blocks: 2_621_440,
                blocks_free: 655_360,
                blocks_avail: 524_288,
                files: 655_360,
                files_free: 500_000,
                name_max: 255,
            },
        );
        fs.add_usage(
            "/data",
            FsUsage {
                block_size: 4096,
                blocks: 26_214_400,
                blocks_free: 26_214_400,
                blocks_avail: 26_214_400,
                files: 1_000_000,
                files_free: 999_990,
                name_max: 255,
            },
        );

        fs
    }

    /// `typical_system` one second later.
    ///
    /// Increments: every CPU +100 user, +50 sys, +100 idle; ctxt +1000;
    /// processes +50; sda +100 reads, +2000 read sectors, +50 writes,
    /// +1000 write sectors, +500 ms io time, +600 ms weighted; sdb idle;
    /// eth0 +100000 rx bytes, +50000 tx bytes.
    pub fn after_one_second() -> Self {
        let mut fs = Self::typical_system();

        fs.add_file("/proc/uptime", "200001.53 790004.10\n");
        fs.add_file(
            "/proc/stat",
            "\
cpu  10400 500 3200 80400 1000 200 100 0 0 0
cpu0 2600 125 800 20100 250 50 25 0 0 0
cpu1 2600 125 800 20100 250 50 25 0 0 0
cpu2 2600 125 800 20100 250 50 25 0 0 0
cpu3 2600 125 800 20100 250 50 25 0 0 0
intr 1000100 50 0 0 0 0 0 0 0 1 0 0 0 100 0 0 1000
ctxt 501000
btime 1700000000
processes 10050
procs_running 3
procs_blocked 1
",
        );
        fs.add_file(
            "/proc/diskstats",
            "\
   8       0 sda 12445 100 989654 5000 6839 50 457789 3000 2 4500 8600 0 0 0 0
   8       1 sda1 10100 802000 5050 401000
   8      16 sdb 100 0 2000 10 50 0 1000 5 0 20 30
   7       0 loop0 60 0 480 1 0 0 0 0 0 1 1
",
        );
        fs.add_file(
            "/proc/net/dev",
            format!(
                "{NET_DEV_HEADER}\
    lo: 12345678     9876    0    0    0     0          0         0 12345678     9876    0    0    0     0       0          0
  eth0: 987754321   654421    5   10    0     0          0       100 123506789   456839    2    5    0     0       0          0
veth1a2b: 1500 15 0 0 0 0 0 0 2500 25 0 0 0 0 0 0
"
            ),
        );

        fs
    }

    /// `typical_system` inside a container limited to CPUs 0 and 1.
    pub fn restricted_container() -> Self {
        let mut fs = Self::typical_system();
        fs.add_file("/sys/fs/cgroup/cpuset.cpus.effective", "0-1\n");
        fs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::traits::FileSystem;
    use std::path::Path;

    #[test]
    fn test_typical_system_has_required_files() {
        let fs = MockFs::typical_system();

        for path in [
            "/proc/stat",
            "/proc/meminfo",
            "/proc/vmstat",
            "/proc/loadavg",
            "/proc/uptime",
            "/proc/diskstats",
            "/proc/net/dev",
            "/proc/cpuinfo",
            "/proc/version",
            "/proc/sys/kernel/hostname",
            "/proc/self/status",
            "/etc/os-release",
            "/etc/passwd",
            "/etc/hosts",
            "/etc/mtab",
        ] {
            assert!(fs.exists(Path::new(path)), "missing {}", path);
        }
    }

    #[test]
    fn test_after_one_second_advances_counters() {
        let before = MockFs::typical_system();
        let after = MockFs::after_one_second();

        let stat_before = before.read_to_string(Path::new("/proc/stat")).unwrap();
        let stat_after = after.read_to_string(Path::new("/proc/stat")).unwrap();
        assert!(stat_before.contains("ctxt 500000"));
        assert!(stat_after.contains("ctxt 501000"));

        // Static files stay the same.
        assert_eq!(
            before.read_to_string(Path::new("/proc/cpuinfo")).unwrap(),
            after.read_to_string(Path::new("/proc/cpuinfo")).unwrap()
        );
    }

    #[test]
    fn test_restricted_container_has_cpuset() {
        let fs = MockFs::restricted_container();
        let cpus = fs
            .read_to_string(Path::new("/sys/fs/cgroup/cpuset.cpus.effective"))
            .unwrap();
        assert_eq!(cpus.trim(), "0-1");
    }
}
