//! Built-in sample write-ups.
//!
//! These records seed the session whenever the backing store cannot be used,
//! so readers always see a working site.

use chrono::NaiveDate;

use crate::record::{Difficulty, Writeup};

/// Display metadata for a known platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformInfo {
    /// Lower-case grouping key.
    pub key: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// Icon token understood by the presentation layer.
    pub icon: &'static str,
}

/// Icon used for platforms missing from [`PLATFORMS`].
pub const FALLBACK_ICON: &str = "Folder";

/// The known platforms, in display order.
pub const PLATFORMS: [PlatformInfo; 4] = [
    PlatformInfo {
        key: "tryhackme",
        name: "TryHackMe",
        description: "tryhackme platform writeups and walkthroughs",
        icon: "Target",
    },
    PlatformInfo {
        key: "hackthebox",
        name: "HackTheBox",
        description: "hackthebox machine writeups and challenges",
        icon: "Box",
    },
    PlatformInfo {
        key: "vulnhub",
        name: "VulnHub",
        description: "vulnhub vm writeups and solutions",
        icon: "Monitor",
    },
    PlatformInfo {
        key: "ctf",
        name: "CTF",
        description: "capture the flag competition writeups",
        icon: "Flag",
    },
];

/// Look up a known platform by key, ignoring case.
#[must_use]
pub fn platform_info(key: &str) -> Option<&'static PlatformInfo> {
    PLATFORMS.iter().find(|p| p.key.eq_ignore_ascii_case(key))
}

struct Fixture {
    id: &'static str,
    title: &'static str,
    description: &'static str,
    platform: &'static str,
    difficulty: Difficulty,
    date: (i32, u32, u32),
    tags: &'static [&'static str],
    slug: &'static str,
    content: &'static str,
}

const FIXTURES: &[Fixture] = &[
    Fixture {
        id: "1",
        title: "hackfinity battle vault",
        description: "advanced web application penetration testing challenge",
        platform: "tryhackme",
        difficulty: Difficulty::Hard,
        date: (2025, 1, 15),
        tags: &["Web Security", "SQL Injection", "XSS", "Authentication Bypass"],
        slug: "hackfinity-battle-vault",
        content: "# Hackfinity Battle Vault

## Overview
Advanced web application testing against a vault management system.

## Initial Reconnaissance

### Nmap Scan
```bash
nmap -sC -sV -oN nmap.txt 10.10.10.10
```

SSH on 22, HTTP on 80 and HTTPS on 443.

### Directory Enumeration
```bash
gobuster dir -u http://10.10.10.10 -w /usr/share/wordlists/dirb/common.txt
```

Found `/admin`, `/api` and `/uploads`.

## Exploitation

### Authentication Bypass
The login form is injectable:

```sql
' OR 1=1 --
```

### Privilege Escalation
A custom SUID binary gave root.

## Flags
- User flag: `user{example_flag_here}`
- Root flag: `root{example_flag_here}`

## Lessons Learned
1. Validate user input
2. Restrict file uploads
3. Apply least privilege",
    },
    Fixture {
        id: "2",
        title: "evil gpt v2",
        description: "ai-powered security challenge with prompt injection",
        platform: "tryhackme",
        difficulty: Difficulty::Medium,
        date: (2025, 1, 14),
        tags: &["AI Security", "Prompt Injection", "Web Security", "Machine Learning"],
        slug: "evil-gpt-v2",
        content: "# Evil GPT v2

## Challenge Overview
An AI chatbot guarded by instruction-level restrictions.

## Exploitation Techniques

### Prompt Injection
Role-play framing convinced the model to ignore its system prompt.

## Solution
Understanding how the model ranks instructions was the key.

Flag: `flag{ai_security_is_important}`",
    },
    Fixture {
        id: "3",
        title: "internal network penetration",
        description: "complete guide to internal network penetration testing",
        platform: "hackthebox",
        difficulty: Difficulty::Hard,
        date: (2025, 1, 10),
        tags: &["Network Security", "Active Directory", "Lateral Movement", "Kerberos"],
        slug: "internal-network-penetration",
        content: "# Internal Network Penetration

## Initial Access
A vulnerable web application provided the first foothold.

## Lateral Movement
- Pass-the-Hash
- Kerberoasting
- Golden Ticket

## Domain Compromise
The whole Active Directory domain fell.

Flag: `HTB{internal_network_pwned}`",
    },
    Fixture {
        id: "4",
        title: "buffer overflow basics",
        description: "introduction to buffer overflow exploitation",
        platform: "tryhackme",
        difficulty: Difficulty::Easy,
        date: (2025, 1, 8),
        tags: &["Binary Exploitation", "Buffer Overflow", "Stack", "Assembly"],
        slug: "buffer-overflow-basics",
        content: "# Buffer Overflow Basics

## Concepts Covered
- Stack layout
- Overwriting the return address
- Shellcode and NOP sleds

## Exploitation
A step by step walkthrough of a classic stack overflow.

Flag: `flag{buffer_overflow_master}`",
    },
    Fixture {
        id: "5",
        title: "web api security testing",
        description: "comprehensive api security assessment",
        platform: "hackthebox",
        difficulty: Difficulty::Medium,
        date: (2025, 1, 5),
        tags: &["API Security", "REST", "JWT", "OAuth", "GraphQL"],
        slug: "web-api-security-testing",
        content: "# Web API Security Testing

## Vulnerabilities Found
- Broken authentication
- JWT manipulation
- IDOR
- GraphQL injection

Flag: `HTB{api_security_matters}`",
    },
    Fixture {
        id: "6",
        title: "linux privilege escalation",
        description: "advanced linux privilege escalation techniques",
        platform: "vulnhub",
        difficulty: Difficulty::Hard,
        date: (2025, 1, 3),
        tags: &["Linux", "Privilege Escalation", "SUID", "Capabilities", "Kernel"],
        slug: "linux-privilege-escalation",
        content: "# Linux Privilege Escalation

## Techniques Covered
- SUID binaries
- Capability abuse
- Kernel exploits
- Cron jobs
- Sudo misconfigurations

Flag: `root{linux_privilege_esc}`",
    },
    Fixture {
        id: "7",
        title: "ctf crypto challenges",
        description: "cryptography challenges from recent ctf competitions",
        platform: "ctf",
        difficulty: Difficulty::Medium,
        date: (2025, 1, 1),
        tags: &["Cryptography", "RSA", "AES", "XOR", "Hash Functions"],
        slug: "ctf-crypto-challenges",
        content: "# CTF Crypto Challenges

## Challenges Solved
1. RSA with weak keys
2. AES in ECB mode
3. Repeating-key XOR
4. Hash length extension

## Tools
- Python cryptography libraries
- CyberChef",
    },
    Fixture {
        id: "8",
        title: "windows active directory attack",
        description: "exploiting active directory misconfigurations",
        platform: "hackthebox",
        difficulty: Difficulty::Insane,
        date: (2024, 12, 28),
        tags: &["Active Directory", "Windows", "BloodHound", "Mimikatz", "PowerShell"],
        slug: "windows-active-directory-attack",
        content: "# Windows Active Directory Attack

## Attack Path
1. BloodHound reconnaissance
2. Kerberoasting
3. AS-REP roasting
4. DCSync
5. Golden Ticket

Flag: `HTB{ad_pwned_completely}`",
    },
];

/// The sample write-ups, newest first.
#[must_use]
pub fn fixture_writeups() -> Vec<Writeup> {
    FIXTURES
        .iter()
        .map(|f| {
            let (y, m, d) = f.date;
            Writeup {
                id: f.id.to_string(),
                title: f.title.to_string(),
                description: f.description.to_string(),
                category: f.platform.to_string(),
                difficulty: f.difficulty,
                platform: f.platform.to_string(),
                date: NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default(),
                tags: f.tags.iter().map(ToString::to_string).collect(),
                content: f.content.to_string(),
                published: true,
                slug: f.slug.to_string(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_fixture_count_and_ids() {
        let writeups = fixture_writeups();
        assert_eq!(writeups.len(), 8);
        let ids: Vec<_> = writeups.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3", "4", "5", "6", "7", "8"]);
    }

    #[test]
    fn test_fixtures_newest_first() {
        let writeups = fixture_writeups();
        assert!(writeups.windows(2).all(|w| w[0].date >= w[1].date));
        assert_eq!(
            writeups.last().unwrap().date,
            NaiveDate::from_ymd_opt(2024, 12, 28).unwrap()
        );
    }

    #[test]
    fn test_fixtures_published_with_unique_slugs() {
        let writeups = fixture_writeups();
        assert!(writeups.iter().all(|w| w.published));
        let slugs: HashSet<_> = writeups.iter().map(|w| w.slug.as_str()).collect();
        assert_eq!(slugs.len(), writeups.len());
    }

    #[test]
    fn test_fixture_slugs_match_titles() {
        for w in fixture_writeups() {
            assert_eq!(crate::record::slugify(&w.title), w.slug);
        }
    }

    #[test]
    fn test_platform_distribution() {
        let writeups = fixture_writeups();
        let count = |p: &str| writeups.iter().filter(|w| w.platform == p).count();
        assert_eq!(count("tryhackme"), 3);
        assert_eq!(count("hackthebox"), 3);
        assert_eq!(count("vulnhub"), 1);
        assert_eq!(count("ctf"), 1);
    }

    #[test]
    fn test_platform_info_lookup() {
        assert_eq!(platform_info("HackTheBox").unwrap().icon, "Box");
        assert_eq!(platform_info("ctf").unwrap().name, "CTF");
        assert!(platform_info("picoctf").is_none());
    }
}
