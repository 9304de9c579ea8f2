//! UDP port discovery for launching the emulator on a free port

use std::collections::HashSet;
use std::ops::Range;
use std::process::Command;

use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::debug;

use crate::errors::PortError;

/// Ports handed out by discovery.
pub const PORT_RANGE: Range<u32> = 10_000..65_536;

/// Addresses whose bound ports count as taken.
const BOUND_ADDRESSES: [&str; 7] = ["::", "localhost", "0.0.0.0", "*", "127.0.0.1", "::1", "[::]"];

/// Socket-table layout of the host's `netstat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// `netstat -an --udp`, `address:port`
    Linux,
    /// `netstat -an -p udp`, `address.port`
    Darwin,
}

impl Platform {
    pub fn current() -> Result<Platform, PortError> {
        match std::env::consts::OS {
            "linux" => Ok(Platform::Linux),
            "macos" => Ok(Platform::Darwin),
            other => Err(PortError::UnsupportedPlatform(other.to_string())),
        }
    }

    fn netstat_args(self) -> &'static [&'static str] {
        match self {
            Platform::Linux => &["-an", "--udp"],
            Platform::Darwin => &["-an", "-p", "udp"],
        }
    }

    fn port_delimiter(self) -> char {
        match self {
            Platform::Linux => ':',
            Platform::Darwin => '.',
        }
    }
}

/// Extract the ports bound to wildcard or loopback addresses from `netstat` output.
///
/// The first two lines are headers; the local address is the fourth column.
pub fn parse_used_ports(output: &str, platform: Platform) -> HashSet<u32> {
    let mut used = HashSet::new();

    for line in output.lines().skip(2) {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some(local) = words.get(3) else {
            continue;
        };
        let Some((address, port)) = local.rsplit_once(platform.port_delimiter()) else {
            continue;
        };
        if port == "*" {
            continue;
        }
        if !BOUND_ADDRESSES.contains(&address) {
            continue;
        }
        if let Ok(port) = port.parse::<u32>() {
            used.insert(port);
        }
    }

    used
}

/// Sample `count` distinct ports from `range` that are not in `used`.
pub fn sample_open_ports<R: Rng + ?Sized>(
    used: &HashSet<u32>,
    range: Range<u32>,
    count: usize,
    rng: &mut R,
) -> Result<Vec<u32>, PortError> {
    let available: Vec<u32> = range.filter(|port| !used.contains(port)).collect();
    if available.len() < count {
        return Err(PortError::NotEnoughPorts {
            requested: count,
            available: available.len(),
        });
    }

    Ok(available.choose_multiple(rng, count).copied().collect())
}

/// Find `count` UDP ports that nothing on this host is bound to.
pub fn find_open_udp_ports(count: usize) -> Result<Vec<u32>, PortError> {
    let platform = Platform::current()?;
    let used = list_used_ports("netstat", platform)?;
    debug!("{} UDP ports in use", used.len());

    let mut rng = rand::rng();
    sample_open_ports(&used, PORT_RANGE, count, &mut rng)
}

/// Run `program` with the platform's `netstat` arguments and parse its socket table.
fn list_used_ports(program: &str, platform: Platform) -> Result<HashSet<u32>, PortError> {
    let output = Command::new(program)
        .args(platform.netstat_args())
        .output()?;
    if !output.status.success() {
        return Err(PortError::ListingFailed {
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(parse_used_ports(&String::from_utf8_lossy(&output.stdout), platform))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const LINUX_NETSTAT: &str = "\
Active Internet connections (servers and established)
Proto Recv-Q Send-Q Local Address           Foreign Address         State
udp        0      0 0.0.0.0:10068           0.0.0.0:*
udp        0      0 127.0.0.1:10323         0.0.0.0:*
udp        0      0 192.168.1.4:10999       0.0.0.0:*
udp6       0      0 :::10353                :::*
";

    const DARWIN_NETSTAT: &str = "\
Active Internet connections (including servers)
Proto Recv-Q Send-Q  Local Address          Foreign Address        (state)
udp4       0      0  *.10353                *.*
udp4       0      0  *.*                    *.*
udp46      0      0  *.10500                *.*
udp4       0      0  10.0.0.2.10777         *.*
";

    #[test]
    fn test_parse_linux_socket_table() {
        let used = parse_used_ports(LINUX_NETSTAT, Platform::Linux);
        assert_eq!(used, HashSet::from([10068, 10323, 10353]));
    }

    #[test]
    fn test_parse_darwin_socket_table() {
        let used = parse_used_ports(DARWIN_NETSTAT, Platform::Darwin);
        assert_eq!(used, HashSet::from([10353, 10500]));
    }

    #[test]
    fn test_sampled_ports_avoid_used_ports() {
        let mut rng = StdRng::seed_from_u64(7);
        let used: HashSet<u32> = (10_000..10_090).collect();

        for _ in 0..20 {
            let ports = sample_open_ports(&used, 10_000..10_100, 5, &mut rng).unwrap();
            let distinct: HashSet<u32> = ports.iter().copied().collect();
            assert_eq!(ports.len(), 5);
            assert_eq!(distinct.len(), 5);
            assert!(ports.iter().all(|port| (10_000..10_100).contains(port)));
            assert!(distinct.is_disjoint(&used));
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_netstat_is_an_error() {
        let result = list_used_ports("false", Platform::Linux);
        assert!(matches!(result, Err(PortError::ListingFailed { .. })));

        assert!(matches!(
            list_used_ports("/nonexistent/netstat", Platform::Linux),
            Err(PortError::Listing(_))
        ));
    }

    #[test]
    fn test_sampling_fails_when_range_exhausted() {
        let mut rng = StdRng::seed_from_u64(1);
        let used: HashSet<u32> = (10_000..10_098).collect();
        let result = sample_open_ports(&used, 10_000..10_100, 3, &mut rng);
        assert!(matches!(
            result,
            Err(PortError::NotEnoughPorts {
                requested: 3,
                available: 2
            })
        ));
    }
}
