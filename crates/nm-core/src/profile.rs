use crate::context::GeoClassification;

/// The code-hosting endpoint the verification subsystem targets.
pub const CODE_HOST_DOMAIN: &str = "gitee.com";

/// Last-known-good address for the code host, used when every resolution
/// method comes up empty.
pub const CODE_HOST_FALLBACK_IP: &str = "212.64.62.174";

/// Hostnames rewritten in the hosts table for the code host.
pub const CODE_HOST_NAMES: &[&str] = &["gitee.com", "www.gitee.com", "api.gitee.com"];

/// GitHub hosts-table override block (official addresses).
pub const GITHUB_HOSTS: &[(&str, &str)] = &[
    ("140.82.112.3", "github.com"),
    ("140.82.112.9", "codeload.github.com"),
    ("140.82.113.5", "api.github.com"),
    ("140.82.113.10", "uploads.github.com"),
    ("140.82.114.9", "raw.githubusercontent.com"),
    ("140.82.114.10", "gist.githubusercontent.com"),
    ("140.82.114.11", "cloud.githubusercontent.com"),
    ("140.82.114.12", "camo.githubusercontent.com"),
    ("140.82.114.13", "avatars0.githubusercontent.com"),
    ("140.82.114.14", "avatars1.githubusercontent.com"),
    ("140.82.114.15", "avatars2.githubusercontent.com"),
    ("140.82.114.16", "avatars3.githubusercontent.com"),
];

const DOMESTIC_DNS: &[&str] = &["223.5.5.5", "119.29.29.29", "114.114.114.114", "8.8.8.8"];
const OVERSEAS_DNS: &[&str] = &["8.8.8.8", "8.8.4.4", "1.1.1.1", "1.0.0.1"];

const DOMESTIC_DOCKER_MIRRORS: &[&str] = &[
    "https://docker.mirrors.ustc.edu.cn",
    "https://hub-mirror.c.163.com",
    "https://mirror.baidubce.com",
    "https://registry.docker-cn.com",
];
const OVERSEAS_DOCKER_MIRRORS: &[&str] = &["https://registry-1.docker.io", "https://docker.io"];

/// TCP tuning keys appended to sysctl.conf, identical for both regions.
pub const SYSCTL_TUNING: &[(&str, &str)] = &[
    ("net.core.rmem_max", "16777216"),
    ("net.core.wmem_max", "16777216"),
    ("net.ipv4.tcp_rmem", "4096 87380 16777216"),
    ("net.ipv4.tcp_wmem", "4096 65536 16777216"),
    ("net.ipv4.tcp_congestion_control", "bbr"),
    ("net.ipv4.tcp_window_scaling", "1"),
    ("net.ipv4.tcp_timestamps", "1"),
    ("net.ipv4.tcp_sack", "1"),
    ("net.core.netdev_max_backlog", "5000"),
    ("net.ipv4.tcp_max_syn_backlog", "8192"),
    ("net.ipv4.tcp_max_tw_buckets", "2000000"),
    ("net.ipv4.tcp_tw_reuse", "1"),
    ("net.ipv4.tcp_fin_timeout", "30"),
    ("net.ipv4.tcp_keepalive_time", "1200"),
    ("net.ipv4.tcp_keepalive_intvl", "15"),
    ("net.ipv4.tcp_keepalive_probes", "5"),
];

/// Region-dependent optimization settings, selected once from the
/// classification and read-only afterwards.
#[derive(Debug, Clone)]
pub struct RegionProfile {
    pub dns_servers: &'static [&'static str],
    pub docker_mirrors: &'static [&'static str],
    /// Domestic hosts get git URL rewrites pointing GitHub clones at the
    /// domestic code host.
    pub use_code_host_git_mirror: bool,
}

impl RegionProfile {
    pub fn for_classification(geo: &GeoClassification) -> Self {
        if geo.is_domestic {
            Self {
                dns_servers: DOMESTIC_DNS,
                docker_mirrors: DOMESTIC_DOCKER_MIRRORS,
                use_code_host_git_mirror: true,
            }
        } else {
            Self {
                dns_servers: OVERSEAS_DNS,
                docker_mirrors: OVERSEAS_DOCKER_MIRRORS,
                use_code_host_git_mirror: false,
            }
        }
    }
}
