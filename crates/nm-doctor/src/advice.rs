//! Static manual-workaround catalogue shown once automated remediation has
//! exhausted its options. Pure text; nothing here is computed.

/// Manual workarounds for an unreachable code host.
pub fn present_alternatives(domain: &str) {
    println!("\n💡 Manual workarounds for {}:", domain);
    println!("{}", "=".repeat(50));

    println!("1. 🌐 Mirror sites:");
    println!("   - https://{} (official)", domain);
    println!("   - https://git.oschina.net (legacy domain)");

    println!("\n2. 🔧 HTTP/SOCKS proxy:");
    println!("   export http_proxy=http://proxy-server:port");
    println!("   export https_proxy=http://proxy-server:port");
    println!("   export all_proxy=socks5://proxy-server:port");

    println!("\n3. 🐙 Git-level proxy:");
    println!("   git config --global http.proxy http://proxy-server:port");
    println!("   git config --global http.proxy socks5://proxy-server:port");

    println!("\n4. 🔑 SSH transport:");
    println!("   ssh-keygen -t rsa -b 4096 -C 'you@example.com'");
    println!("   cat ~/.ssh/id_rsa.pub   # add to your {} account", domain);
    println!("   ssh -T git@{}", domain);

    println!("\n5. 🐙 GitHub as fallback:");
    println!("   git clone https://github.com/user/repository.git");
    println!(
        "   git config --global url.'https://github.com/'.insteadOf 'https://{}/'",
        domain
    );

    println!("\n6. 📝 Manual hosts entry:");
    println!("   sudo nano /etc/hosts   # add a fresh address for {}", domain);
    println!("   current addresses: https://www.ipaddress.com/site/{}", domain);

    println!("\n{}", "=".repeat(50));
    println!("💡 Try the options in order; contact your network operator if none work.");
}

/// Extra guidance for overseas servers, which often cannot reach the
/// domestic code host at all.
pub fn present_overseas_workarounds(domain: &str) {
    println!("\n🌍 Overseas-server specific options for {}:", domain);
    println!("{}", "=".repeat(50));

    println!("1. 🔒 VPN into a domestic network, then retry:");
    println!("   curl -I https://{}", domain);

    println!("\n2. 🔗 SSH tunnel through a domestic server:");
    println!("   ssh -D 1080 user@your-domestic-server");
    println!("   export all_proxy=socks5://127.0.0.1:1080");

    println!("\n3. 📋 Manual sync via a domestic machine:");
    println!("   git clone https://{}/user/repository.git   # on the domestic host", domain);
    println!("   tar -czf repository.tar.gz repository/ && scp to this server");

    println!("\n4. 🪞 Use a mirror of the project on another forge.");

    println!("\n{}", "=".repeat(50));
}

/// Package-manager commands for the missing lookup tools.
pub fn suggest_tool_install() {
    println!("\n🔧 Installing the DNS lookup tools:");
    println!("   Debian/Ubuntu: sudo apt update && sudo apt install dnsutils net-tools");
    println!("   RHEL/Fedora:   sudo dnf install bind-utils net-tools");
    println!("   (rerun netmend afterwards for a more detailed diagnosis)");
}
