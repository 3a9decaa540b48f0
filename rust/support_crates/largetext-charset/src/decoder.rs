use crate::{
    charset::{Charset, CodingErrorAction, DecoderOptions},
    single_byte, utf8, utf16,
};

/// Result of a single [`CharDecoder::decode`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeStep {
    /// Number of input bytes consumed. When decoding stopped early, this is the
    /// position of the first byte that was not consumed.
    pub consumed: usize,
    pub outcome: DecodeOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// The whole input was consumed.
    Complete,
    /// The input ends with the prefix of a valid multi-byte sequence and more
    /// input was announced (`last == false`).
    Incomplete,
    /// A malformed sequence of `length` bytes starts at `consumed`, and malformed
    /// input is reported.
    Malformed { length: usize },
    /// An unmappable sequence of `length` bytes starts at `consumed`, and
    /// unmappable input is reported.
    Unmappable { length: usize },
}

/// Classification of the bytes at the current decoding position.
pub(crate) enum Scan {
    /// A character encoded on the given number of bytes.
    Char(char, usize),
    /// The input ends before the sequence does.
    Truncated,
    Malformed(usize),
    Unmappable(usize),
}

/// Streaming decoder from bytes to characters.
///
/// The decoder is reusable across calls; it carries the decoding policy and
/// running counters of resolved errors.
#[derive(Debug, Clone)]
pub struct CharDecoder {
    options: DecoderOptions,
    replaced: u64,
    skipped: u64,
}

impl CharDecoder {
    pub fn new(options: DecoderOptions) -> CharDecoder {
        CharDecoder {
            options,
            replaced: 0,
            skipped: 0,
        }
    }

    pub fn options(&self) -> &DecoderOptions {
        &self.options
    }

    pub fn charset(&self) -> Charset {
        self.options.charset
    }

    /// Number of malformed or unmappable sequences replaced so far.
    pub fn replaced_count(&self) -> u64 {
        self.replaced
    }

    /// Number of malformed or unmappable sequences skipped so far.
    pub fn skipped_count(&self) -> u64 {
        self.skipped
    }

    pub fn reset(&mut self) {
        self.replaced = 0;
        self.skipped = 0;
    }

    /// Decodes `input`, appending characters to `output`.
    ///
    /// `last` tells whether the input is the end of the stream: when it is, a
    /// truncated trailing sequence is malformed rather than incomplete.
    pub fn decode(&mut self, input: &[u8], output: &mut Vec<char>, last: bool) -> DecodeStep {
        match self.options.charset {
            Charset::Utf8 => utf8::decode(self, input, output, last),
            Charset::Utf16Le => self.decode_with(input, output, last, utf16::scan_le),
            Charset::Utf16Be => self.decode_with(input, output, last, utf16::scan_be),
            Charset::UsAscii => self.decode_with(input, output, last, single_byte::scan_ascii),
            Charset::Iso8859_1 => self.decode_with(input, output, last, single_byte::scan_latin1),
            Charset::Windows1252 => {
                self.decode_with(input, output, last, single_byte::scan_windows1252)
            }
        }
    }

    /// Decodes the entire `input` as a complete stream.
    ///
    /// Returns the first reported error as the `Err` step.
    pub fn decode_to_vec(&mut self, input: &[u8]) -> Result<Vec<char>, DecodeStep> {
        let mut output = Vec::with_capacity(input.len());
        let step = self.decode(input, &mut output, true);
        match step.outcome {
            DecodeOutcome::Complete => Ok(output),
            _ => Err(step),
        }
    }

    fn decode_with(
        &mut self,
        input: &[u8],
        output: &mut Vec<char>,
        last: bool,
        scan: fn(&[u8]) -> Scan,
    ) -> DecodeStep {
        let mut pos = 0;
        while pos < input.len() {
            let rest = &input[pos..];
            match scan(rest) {
                Scan::Char(c, len) => {
                    output.push(c);
                    pos += len;
                }
                Scan::Truncated if !last => {
                    return DecodeStep {
                        consumed: pos,
                        outcome: DecodeOutcome::Incomplete,
                    };
                }
                Scan::Truncated => {
                    if let Some(step) = self.on_malformed(pos, rest.len(), output) {
                        return step;
                    }
                    pos += rest.len();
                }
                Scan::Malformed(len) => {
                    if let Some(step) = self.on_malformed(pos, len, output) {
                        return step;
                    }
                    pos += len;
                }
                Scan::Unmappable(len) => {
                    if let Some(step) = self.on_unmappable(pos, len, output) {
                        return step;
                    }
                    pos += len;
                }
            }
        }
        DecodeStep {
            consumed: pos,
            outcome: DecodeOutcome::Complete,
        }
    }

    /// Applies the malformed-input action; returns a step when decoding must stop.
    pub(crate) fn on_malformed(
        &mut self,
        pos: usize,
        length: usize,
        output: &mut Vec<char>,
    ) -> Option<DecodeStep> {
        self.resolve(
            self.options.on_malformed,
            output,
            DecodeStep {
                consumed: pos,
                outcome: DecodeOutcome::Malformed { length },
            },
        )
    }

    pub(crate) fn on_unmappable(
        &mut self,
        pos: usize,
        length: usize,
        output: &mut Vec<char>,
    ) -> Option<DecodeStep> {
        self.resolve(
            self.options.on_unmappable,
            output,
            DecodeStep {
                consumed: pos,
                outcome: DecodeOutcome::Unmappable { length },
            },
        )
    }

    fn resolve(
        &mut self,
        action: CodingErrorAction,
        output: &mut Vec<char>,
        failure: DecodeStep,
    ) -> Option<DecodeStep> {
        match action {
            CodingErrorAction::Report => Some(failure),
            CodingErrorAction::Replace => {
                output.push(self.options.replacement);
                self.replaced += 1;
                None
            }
            CodingErrorAction::Ignore => {
                self.skipped += 1;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{CharDecoder, Charset, CodingErrorAction, DecodeOutcome, DecodeStep, DecoderOptions};

    fn options(charset: Charset, action: CodingErrorAction) -> DecoderOptions {
        DecoderOptions::new(charset).with_action(action)
    }

    fn decode_all(options: DecoderOptions, input: &[u8]) -> (String, DecodeStep) {
        let mut decoder = CharDecoder::new(options);
        let mut out = Vec::new();
        let step = decoder.decode(input, &mut out, true);
        (out.into_iter().collect(), step)
    }

    #[test]
    fn test_utf8_invalid_continuation() {
        let input = b"Hel\xD0o";
        let (text, step) = decode_all(options(Charset::Utf8, CodingErrorAction::Report), input);
        assert_eq!(text, "Hel");
        assert_eq!(
            step,
            DecodeStep {
                consumed: 3,
                outcome: DecodeOutcome::Malformed { length: 1 }
            }
        );

        let (text, step) = decode_all(options(Charset::Utf8, CodingErrorAction::Replace), input);
        assert_eq!(text, "Hel\u{FFFD}o");
        assert_eq!(step.consumed, 5);
        assert_eq!(step.outcome, DecodeOutcome::Complete);

        let (text, _) = decode_all(options(Charset::Utf8, CodingErrorAction::Ignore), input);
        assert_eq!(text, "Helo");
    }

    #[test]
    fn test_utf8_truncated_sequence() {
        let input = "aé€😀".as_bytes();
        let mut decoder = CharDecoder::new(DecoderOptions::new(Charset::Utf8));
        for cut in 0..input.len() {
            let mut out = Vec::new();
            let step = decoder.decode(&input[..cut], &mut out, false);
            let expected = std::str::from_utf8(&input[..step.consumed]).unwrap();
            assert_eq!(out.iter().collect::<String>(), expected);
            if step.outcome == DecodeOutcome::Incomplete {
                assert!(step.consumed < cut);
            } else {
                assert_eq!(step.outcome, DecodeOutcome::Complete);
                assert_eq!(step.consumed, cut);
            }
        }
    }

    #[test]
    fn test_utf8_truncated_at_end_of_stream_is_malformed() {
        let (text, step) = decode_all(options(Charset::Utf8, CodingErrorAction::Report), b"ab\xE2\x82");
        assert_eq!(text, "ab");
        assert_eq!(step.outcome, DecodeOutcome::Malformed { length: 2 });

        let (text, _) = decode_all(options(Charset::Utf8, CodingErrorAction::Replace), b"ab\xE2\x82");
        assert_eq!(text, "ab\u{FFFD}");
    }

    #[test]
    fn test_utf16() {
        let text = "a😀z";
        let le = text
            .encode_utf16()
            .flat_map(|u| u.to_le_bytes())
            .collect::<Vec<u8>>();
        let be = text
            .encode_utf16()
            .flat_map(|u| u.to_be_bytes())
            .collect::<Vec<u8>>();
        let report = CodingErrorAction::Report;
        assert_eq!(decode_all(options(Charset::Utf16Le, report), &le).0, text);
        assert_eq!(decode_all(options(Charset::Utf16Be, report), &be).0, text);

        // Cut in the middle of the surrogate pair.
        let mut decoder = CharDecoder::new(DecoderOptions::new(Charset::Utf16Le));
        let mut out = Vec::new();
        let step = decoder.decode(&le[..5], &mut out, false);
        assert_eq!(step.consumed, 2);
        assert_eq!(step.outcome, DecodeOutcome::Incomplete);

        // Lone low surrogate.
        let lone = [0x00, 0xDC, 0x41, 0x00];
        let (text, step) = decode_all(options(Charset::Utf16Le, CodingErrorAction::Replace), &lone);
        assert_eq!(text, "\u{FFFD}A");
        assert_eq!(step.outcome, DecodeOutcome::Complete);
    }

    #[test]
    fn test_single_byte_charsets() {
        let (text, step) = decode_all(options(Charset::UsAscii, CodingErrorAction::Report), b"ab\xE9c");
        assert_eq!(text, "ab");
        assert_eq!(step.outcome, DecodeOutcome::Malformed { length: 1 });

        let (text, _) = decode_all(options(Charset::Iso8859_1, CodingErrorAction::Report), b"ab\xE9c");
        assert_eq!(text, "abéc");

        let (text, step) =
            decode_all(options(Charset::Windows1252, CodingErrorAction::Report), b"\x80x\x81");
        assert_eq!(text, "€x");
        assert_eq!(
            step,
            DecodeStep {
                consumed: 2,
                outcome: DecodeOutcome::Unmappable { length: 1 }
            }
        );
    }

    #[test]
    fn test_independent_actions_and_counters() {
        let mut options = DecoderOptions::new(Charset::Windows1252);
        options.on_unmappable = CodingErrorAction::Replace;
        options.replacement = '?';
        let mut decoder = CharDecoder::new(options);
        let text = decoder.decode_to_vec(b"a\x81b\x8Dc").unwrap();
        assert_eq!(text.iter().collect::<String>(), "a?b?c");
        assert_eq!(decoder.replaced_count(), 2);
        assert_eq!(decoder.skipped_count(), 0);

        let mut options = DecoderOptions::new(Charset::Utf8);
        options.on_malformed = CodingErrorAction::Ignore;
        let mut decoder = CharDecoder::new(options);
        let text = decoder.decode_to_vec(b"\xFFa\xC0\xAFb").unwrap();
        assert_eq!(text.iter().collect::<String>(), "ab");
        assert_eq!(decoder.skipped_count(), 3);
    }
}
