//! Hex dump formatting for debug diagnostics.

/// Produce a hex dump of `data` with file-relative offsets.
///
/// Output format (16 bytes per line):
/// ```text
/// 00000000  xx xx xx xx xx xx xx xx  xx xx xx xx xx xx xx xx  |................|
/// ```
pub fn hex_dump(data: &[u8], base_offset: u64) -> String {
    let mut lines = Vec::new();

    for (i, chunk) in data.chunks(16).enumerate() {
        let offset = base_offset + (i * 16) as u64;
        let mut line = format!("{:08x}  ", offset);

        for j in 0..16 {
            if j == 8 {
                line.push(' ');
            }
            match chunk.get(j) {
                Some(b) => line.push_str(&format!("{:02x} ", b)),
                None => line.push_str("   "),
            }
        }

        line.push_str(" |");
        for &b in chunk {
            if b.is_ascii_graphic() || b == b' ' {
                line.push(b as char);
            } else {
                line.push('.');
            }
        }
        for _ in chunk.len()..16 {
            line.push(' ');
        }
        line.push('|');
        lines.push(line);
    }

    lines.join("\n")
}
