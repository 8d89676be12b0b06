//! 局域网地址发现。

use std::io;
use std::net::{IpAddr, Ipv4Addr};
use tracing::debug;

/// 从网卡列表中选出第一个私有网段的 IPv4 地址。
///
/// 跳过回环与 IPv6 地址；以 `10.`、`172.` 或 `192.168.` 开头即视为局域网地址，
/// `172.` 整段都接受，不限于 `172.16.0.0/12`。
pub fn select_lan_ipv4<'a, I>(interfaces: I) -> Option<Ipv4Addr>
where
    I: IntoIterator<Item = &'a (String, IpAddr)>,
{
    interfaces.into_iter().find_map(|(name, addr)| match addr {
        IpAddr::V4(v4) if !v4.is_loopback() && is_lan_prefix(v4) => {
            debug!(interface = %name, address = %v4, "selected lan address");
            Some(*v4)
        }
        _ => None,
    })
}

fn is_lan_prefix(addr: &Ipv4Addr) -> bool {
    matches!(addr.octets(), [10, ..] | [172, ..] | [192, 168, ..])
}

/// 枚举本机网卡并返回第一个局域网 IPv4 地址。
pub fn discover_lan_ipv4() -> io::Result<Ipv4Addr> {
    let interfaces = local_ip_address::list_afinet_netifas()
        .map_err(|err| io::Error::other(err.to_string()))?;
    select_lan_ipv4(&interfaces).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            "no LAN IPv4 address found, make sure this host is on a LAN",
        )
    })
}
