use crate::decoder::Scan;

pub(crate) fn scan_le(input: &[u8]) -> Scan {
    scan(input, u16::from_le_bytes)
}

pub(crate) fn scan_be(input: &[u8]) -> Scan {
    scan(input, u16::from_be_bytes)
}

fn scan(input: &[u8], unit: fn([u8; 2]) -> u16) -> Scan {
    if input.len() < 2 {
        return Scan::Truncated;
    }
    let first = unit([input[0], input[1]]);
    match first {
        0xD800..=0xDBFF => {
            if input.len() < 4 {
                return Scan::Truncated;
            }
            let second = unit([input[2], input[3]]);
            if !(0xDC00..=0xDFFF).contains(&second) {
                return Scan::Malformed(2);
            }
            let code = 0x10000 + (((first as u32) - 0xD800) << 10) + ((second as u32) - 0xDC00);
            match char::from_u32(code) {
                Some(c) => Scan::Char(c, 4),
                None => Scan::Malformed(4),
            }
        }
        0xDC00..=0xDFFF => Scan::Malformed(2),
        _ => match char::from_u32(first as u32) {
            Some(c) => Scan::Char(c, 2),
            None => Scan::Malformed(2),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{scan_be, scan_le};
    use crate::decoder::Scan;

    #[test]
    fn test_scan_units() {
        assert!(matches!(scan_le(&[0x41]), Scan::Truncated));
        assert!(matches!(scan_le(&[0x41, 0x00]), Scan::Char('A', 2)));
        assert!(matches!(scan_be(&[0x00, 0x41]), Scan::Char('A', 2)));
        assert!(matches!(scan_be(&[0xD8, 0x3D, 0xDE]), Scan::Truncated));
        assert!(matches!(
            scan_be(&[0xD8, 0x3D, 0xDE, 0x00]),
            Scan::Char('\u{1F600}', 4)
        ));
        assert!(matches!(scan_be(&[0xD8, 0x3D, 0x00, 0x41]), Scan::Malformed(2)));
    }
}
