use crate::decoder::Scan;

/// Code points of windows-1252 bytes 0x80..=0x9F; zero marks an undefined byte.
const WINDOWS_1252_HIGH: [u16; 32] = [
    0x20AC, 0x0000, 0x201A, 0x0192, 0x201E, 0x2026, 0x2020, 0x2021, 0x02C6, 0x2030, 0x0160,
    0x2039, 0x0152, 0x0000, 0x017D, 0x0000, 0x0000, 0x2018, 0x2019, 0x201C, 0x201D, 0x2022,
    0x2013, 0x2014, 0x02DC, 0x2122, 0x0161, 0x203A, 0x0153, 0x0000, 0x017E, 0x0178,
];

pub(crate) fn scan_ascii(input: &[u8]) -> Scan {
    match input[0] {
        b @ 0x00..=0x7F => Scan::Char(b as char, 1),
        _ => Scan::Malformed(1),
    }
}

pub(crate) fn scan_latin1(input: &[u8]) -> Scan {
    Scan::Char(input[0] as char, 1)
}

pub(crate) fn scan_windows1252(input: &[u8]) -> Scan {
    let b = input[0];
    if !(0x80..=0x9F).contains(&b) {
        return Scan::Char(b as char, 1);
    }
    match WINDOWS_1252_HIGH[(b - 0x80) as usize] {
        0 => Scan::Unmappable(1),
        code => match char::from_u32(code as u32) {
            Some(c) => Scan::Char(c, 1),
            None => Scan::Unmappable(1),
        },
    }
}
