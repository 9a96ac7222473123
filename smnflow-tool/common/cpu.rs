// Logical CPU enumeration

/// Online logical CPUs from /sys/devices/system/cpu/online
pub fn online_cpus() -> Vec<u32> {
    std::fs::read_to_string("/sys/devices/system/cpu/online")
        .ok()
        .and_then(|s| parse_cpu_list(&s))
        .unwrap_or_else(|| {
            tracing::warn!("Failed to detect online CPUs, using default: 0");
            vec![0]
        })
}

/// Parse CPU list like "0-3,8-11" into Vec<u32>
pub fn parse_cpu_list(s: &str) -> Option<Vec<u32>> {
    let mut cpus = Vec::new();
    for part in s.trim().split(',') {
        if let Some((start, end)) = part.split_once('-') {
            let start: u32 = start.trim().parse().ok()?;
            let end: u32 = end.trim().parse().ok()?;
            cpus.extend(start..=end);
        } else {
            cpus.push(part.trim().parse().ok()?);
        }
    }
    Some(cpus)
}
