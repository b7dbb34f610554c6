// src/utils.rs

/// Process CPU time (user + system) in seconds
pub fn cputime() -> f64 {
    let rusage = unsafe {
        let mut rusage = std::mem::MaybeUninit::<libc::rusage>::zeroed();
        if libc::getrusage(libc::RUSAGE_SELF, rusage.as_mut_ptr()) != 0 {
            return 0.0;
        }
        rusage.assume_init()
    };
    let user_time = rusage.ru_utime;
    let sys_time = rusage.ru_stime;
    (user_time.tv_sec as f64 + user_time.tv_usec as f64 * 1e-6)
        + (sys_time.tv_sec as f64 + sys_time.tv_usec as f64 * 1e-6)
}

/// Human-readable base count (bp, kbp, Mbp, Gbp)
pub fn format_bases(bases: usize) -> String {
    match bases {
        b if b >= 1_000_000_000 => format!("{:.2} Gbp", b as f64 / 1e9),
        b if b >= 1_000_000 => format!("{:.2} Mbp", b as f64 / 1e6),
        b if b >= 1_000 => format!("{:.2} kbp", b as f64 / 1e3),
        b => format!("{} bp", b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cputime_is_monotonic() {
        let start = cputime();
        let mut acc = 0u64;
        for i in 0..200_000u64 {
            acc = acc.wrapping_mul(31).wrapping_add(i);
        }
        assert!(acc != 1);
        assert!(cputime() >= start);
    }

    #[test]
    fn test_format_bases() {
        assert_eq!(format_bases(512), "512 bp");
        assert_eq!(format_bases(1_500), "1.50 kbp");
        assert_eq!(format_bases(3_200_000), "3.20 Mbp");
        assert_eq!(format_bases(3_100_000_000), "3.10 Gbp");
    }
}
