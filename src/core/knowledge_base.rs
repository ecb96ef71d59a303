//! Static, read-only reference data shared by the probe sets.
//! Built at compile time and handed out by reference; nothing here is mutated at runtime.

/// A TCP port the port scanner checks, with the service usually found there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortService {
    pub port: u16,
    pub service: &'static str,
}

/// A DNS-based blacklist: a display label and the zone queried with reversed octets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlacklistService {
    pub name: &'static str,
    pub zone: &'static str,
}

/// A recommended HTTP security header and the value we suggest when it is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderReference {
    pub name: &'static str,
    pub recommended: &'static str,
}

const fn port(port: u16, service: &'static str) -> PortService {
    PortService { port, service }
}

const fn dnsbl(name: &'static str, zone: &'static str) -> BlacklistService {
    BlacklistService { name, zone }
}

pub static PORT_SERVICES: &[PortService] = &[
    port(21, "FTP"),
    port(22, "SSH"),
    port(25, "SMTP"),
    port(53, "DNS"),
    port(80, "HTTP"),
    port(110, "POP3"),
    port(143, "IMAP"),
    port(389, "LDAP"),
    port(443, "HTTPS"),
    port(465, "SMTPS"),
    port(587, "SMTP"),
    port(993, "IMAPS"),
    port(995, "POP3S"),
    port(1433, "MSSQL"),
    port(1521, "Oracle DB"),
    port(3306, "MySQL"),
    port(3389, "RDP"),
    port(5432, "PostgreSQL"),
    port(5900, "VNC"),
    port(6379, "Redis"),
    port(8000, "HTTP-alt"),
    port(8080, "HTTP-proxy"),
    port(8443, "HTTPS-alt"),
    port(9200, "Elasticsearch"),
    port(9300, "Elasticsearch"),
    port(27017, "MongoDB"),
];

// Each zone appears once; several well-known lists publish under more than one name.
pub static BLACKLIST_SERVICES: &[BlacklistService] = &[
    dnsbl("Composite Blocking", "cbl.abuseat.org"),
    dnsbl("Barracuda Reputation Block", "b.barracudacentral.org"),
    dnsbl("DNSBL SPFBL", "dnsbl.spfbl.net"),
    dnsbl("URIBL red", "red.uribl.com"),
    dnsbl("URIBL grey", "grey.uribl.com"),
    dnsbl("URIBL black", "black.uribl.com"),
    dnsbl("URIBL multi", "multi.uribl.com"),
    dnsbl("DroneBL", "dnsbl.dronebl.org"),
    dnsbl("abuse.ro RBL", "rbl.abuse.ro"),
    dnsbl("anonmails.de DNSBL", "spam.dnsbl.anonmails.de"),
    dnsbl("JIPPG's Relay Blackhole", "mail-abuse.blacklist.jippg.org"),
    dnsbl("BlockedServers", "rbl.blockedservers.com"),
    dnsbl("BlockList.de", "bl.blocklist.de"),
    dnsbl("Blog Spam Blacklist", "list.blogspambl.com"),
    dnsbl("Calivent DNSBL", "dnsbl.calivent.com.pe"),
    dnsbl("IBM DNS Blacklist", "dnsbl.cobion.com"),
    dnsbl("Team Cymru Bogons", "bogons.cymru.com"),
    dnsbl("Torexit", "torexit.dan.me.uk"),
    dnsbl("Servicios RBL", "rbl.dns-servicios.com"),
    dnsbl("DrMX", "bl.drmx.org"),
    dnsbl("EFnet - TOR", "rbl.efnetrbl.org"),
    dnsbl("SpamSources RBL", "spamsources.fabel.dk"),
    dnsbl("ZapBL DNSRBL", "dnsbl.zapbl.net"),
    dnsbl("Blog Spam Blocklist", "bsb.empty.us"),
    dnsbl("Spam Lookup RBL", "bsb.spamlookup.net"),
    dnsbl("Spam Eating Monkey", "fresh.spameatingmonkey.net"),
    dnsbl("SURBL multi", "multi.surbl.org"),
    dnsbl("Woodys SMTP Blacklist URIBL", "uri.blacklist.woody.ch"),
    dnsbl("Dynip Rothen List", "dynip.rothen.com"),
    dnsbl("ZoneEdit deny DNS", "ban.zebl.zoneedit.com"),
    dnsbl("The Day Old Bread List", "dob.sibl.support-intelligence.net"),
    dnsbl("Rymshos RHSBL", "rhsbl.rymsho.ru"),
    dnsbl("abuse.ro URI RBL", "uribl.abuse.ro"),
    dnsbl("Zen DNSBL", "zen.spamhaus.org"),
    dnsbl("Spamcop BL", "bl.spamcop.net"),
    dnsbl("UCEPROTECT Level 1", "dnsbl-1.uceprotect.net"),
    dnsbl("UCEPROTECT Level 2", "dnsbl-2.uceprotect.net"),
    dnsbl("UCEPROTECT Level 3", "dnsbl-3.uceprotect.net"),
    dnsbl("UCEPROTECT Level 4", "dnsbl-4.uceprotect.net"),
    dnsbl("Surriel PSBL", "psbl.surriel.com"),
    dnsbl("SpamHaus DNSBL", "dnsbl.sbl.spamhaus.org"),
    dnsbl("SpamHaus PBL", "pbl.spamhaus.org"),
    dnsbl("SpamHaus SBL", "sbl-xbl.spamhaus.org"),
    dnsbl("SpamHaus XBL", "xbl.spamhaus.org"),
    dnsbl("SORBS Spam", "spam.dnsbl.sorbs.net"),
    dnsbl("SORBS Escalations", "escalations.dnsbl.sorbs.net"),
    dnsbl("SORBS Safe", "safe.dnsbl.sorbs.net"),
    dnsbl("SORBS Zombie", "zombie.dnsbl.sorbs.net"),
    dnsbl("SpamRATS", "zen.spamrats.com"),
    dnsbl("Backscatterer", "ips.backscatterer.org"),
    dnsbl("GBUdb Truncate", "truncate.gbudb.net"),
    dnsbl("Invaluement", "ubl.unsubscore.com"),
    dnsbl("Mailspike", "bl.mailspike.net"),
    dnsbl("Mailspike Z", "z.mailspike.net"),
    dnsbl("Worm RBL", "wormrbl.imp.ch"),
    dnsbl("RBL.jp", "virus.rbl.jp"),
    dnsbl("Lashback UBL", "ubl.lashback.com"),
    dnsbl("Abuse.ch", "spam.abuse.ch"),
    dnsbl("S5h ALL", "all.s5h.net"),
    dnsbl("Inps DNSBL", "dnsbl.inps.de"),
    dnsbl("Korea Services", "korea.services.net"),
    dnsbl("0Spam Project", "bl.0spam.org"),
    dnsbl("0spam DBL", "url.0spam.org"),
    dnsbl("JustSpam", "dnsbl.justspam.org"),
];

pub static SECURITY_HEADERS: &[HeaderReference] = &[
    HeaderReference { name: "Content-Security-Policy", recommended: "default-src 'self'" },
    HeaderReference { name: "Strict-Transport-Security", recommended: "max-age=31536000; includeSubDomains" },
    HeaderReference { name: "X-Content-Type-Options", recommended: "nosniff" },
    HeaderReference { name: "X-Frame-Options", recommended: "DENY or SAMEORIGIN" },
    HeaderReference { name: "X-XSS-Protection", recommended: "1; mode=block" },
    HeaderReference { name: "Referrer-Policy", recommended: "no-referrer" },
    HeaderReference { name: "Feature-Policy", recommended: "geolocation 'none'; microphone 'none'" },
    HeaderReference { name: "Permissions-Policy", recommended: "fullscreen=(), geolocation=()" },
];

/// Rotated by the subdomain prober; the first one that gets a 200 wins.
pub static USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.3",
    "Mozilla/5.0 (Windows NT 10.0; WOW64; rv:45.0) Gecko/20100101 Firefox/45.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_13_6) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/12.1.1 Safari/605.1.15",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 11_0 like Mac OS X) AppleWebKit/604.1.38 (KHTML, like Gecko) Version/11.0 Mobile/15A372 Safari/604.1",
];

/// WHOIS lines worth showing; everything else in the registry response is dropped.
pub static WHOIS_FIELDS: &[&str] = &[
    "Domain Name:",
    "Registrar:",
    "Creation Date:",
    "Registry Expiry Date:",
    "Updated Date:",
    "Registrar WHOIS Server:",
    "Registrar URL:",
    "Registrar Abuse Contact Email:",
    "Registrar Abuse Contact Phone:",
    "Name Server:",
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn blacklist_zones_are_unique() {
        let zones: HashSet<&str> = BLACKLIST_SERVICES.iter().map(|s| s.zone).collect();
        assert_eq!(zones.len(), BLACKLIST_SERVICES.len());
    }

    #[test]
    fn port_table_has_no_duplicate_ports() {
        let ports: HashSet<u16> = PORT_SERVICES.iter().map(|p| p.port).collect();
        assert_eq!(ports.len(), PORT_SERVICES.len());
        assert!(PORT_SERVICES.contains(&PortService { port: 443, service: "HTTPS" }));
    }
}
