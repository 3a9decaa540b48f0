#[macro_export]
macro_rules! verify {
    ($expr:expr) => {{
        let result = $expr;
        $crate::utils::verify(result, stringify!($expr))?;
    }};
}

pub fn verify(predicate: bool, condition: &str) -> std::io::Result<()> {
    if predicate {
        Ok(())
    } else {
        Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            condition,
        ))
    }
}

/// Clamps `range` to `0..size`, collapsing it to `0..0` when it lies outside.
pub fn clamp_range(range: std::ops::Range<u64>, size: u64) -> std::ops::Range<u64> {
    if range.start >= size || range.start == range.end {
        return 0..0;
    }
    range.start..std::cmp::min(range.end, size)
}

pub fn to_usize_len(range: &std::ops::Range<u64>) -> std::io::Result<usize> {
    usize::try_from(range.end - range.start).map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "range length exceeds the addressable size",
        )
    })
}
