//! Shared helpers for building small PDF files in memory.

#![allow(dead_code)]

use std::sync::Once;

static INIT: Once = Once::new();

/// Route `log` output through the test harness. Set `RUST_LOG=debug` to see it.
pub fn init_logging() {
    INIT.call_once(|| {
        let _ = env_logger::Builder::from_default_env().is_test(true).try_init();
    });
}

/// Builds a PDF body object by object, remembering where each one starts.
pub struct PdfBuilder {
    pub data: Vec<u8>,
    pub offsets: Vec<(u32, usize)>,
}

impl PdfBuilder {
    pub fn new(version: &str) -> Self {
        Self {
            data: format!("%PDF-{}\n", version).into_bytes(),
            offsets: Vec::new(),
        }
    }

    /// Append `id 0 obj body endobj` and return its offset.
    pub fn object(&mut self, id: u32, body: &str) -> usize {
        let offset = self.data.len();
        self.offsets.push((id, offset));
        self.data
            .extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", id, body).as_bytes());
        offset
    }

    /// Append an unfiltered stream object with a correct `/Length`.
    pub fn stream(&mut self, id: u32, dict_extra: &str, payload: &[u8]) -> usize {
        let offset = self.data.len();
        self.offsets.push((id, offset));
        self.data.extend_from_slice(
            format!("{} 0 obj\n<< /Length {}{} >>\nstream\n", id, payload.len(), dict_extra).as_bytes(),
        );
        self.data.extend_from_slice(payload);
        self.data.extend_from_slice(b"\nendstream\nendobj\n");
        offset
    }

    pub fn offset_of(&self, id: u32) -> usize {
        self.offsets
            .iter()
            .rev()
            .find(|(i, _)| *i == id)
            .map(|&(_, off)| off)
            .unwrap()
    }

    /// Append a classic table covering `0..=max id` plus trailer and `startxref`.
    ///
    /// Returns the offset of the `xref` keyword.
    pub fn finish_classic(&mut self, trailer_extra: &str) -> usize {
        let size = self.offsets.iter().map(|(id, _)| *id).max().unwrap_or(0) + 1;
        let xref = self.data.len();
        self.data
            .extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", size).as_bytes());
        for id in 1..size {
            let line = match self.offsets.iter().rev().find(|(i, _)| *i == id) {
                Some((_, off)) => format!("{:010} 00000 n \n", off),
                None => "0000000000 00001 f \n".to_string(),
            };
            self.data.extend_from_slice(line.as_bytes());
        }
        self.data.extend_from_slice(
            format!(
                "trailer\n<< /Size {}{} >>\nstartxref\n{}\n%%EOF\n",
                size, trailer_extra, xref
            )
            .as_bytes(),
        );
        xref
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// A complete document with `n` pages, each carrying a bookmark titled `"{prefix} {i}"`.
pub fn document_with_pages(n: usize, prefix: &str) -> Vec<u8> {
    let mut b = PdfBuilder::new("1.7");
    let first_page = 4;
    let first_item = first_page + n as u32;
    let kids: Vec<String> = (0..n).map(|i| format!("{} 0 R", first_page + i as u32)).collect();

    b.object(1, "<< /Type /Catalog /Pages 2 0 R /Outlines 3 0 R >>");
    b.object(
        2,
        &format!(
            "<< /Type /Pages /Kids [{}] /Count {} /MediaBox [0 0 612 792] >>",
            kids.join(" "),
            n
        ),
    );
    b.object(
        3,
        &format!(
            "<< /Type /Outlines /First {} 0 R /Last {} 0 R /Count {} >>",
            first_item,
            first_item + n as u32 - 1,
            n
        ),
    );
    for i in 0..n as u32 {
        b.object(first_page + i, "<< /Type /Page /Parent 2 0 R >>");
    }
    for i in 0..n as u32 {
        let mut item = format!(
            "<< /Title ({} {}) /Parent 3 0 R /Dest [{} 0 R /Fit]",
            prefix,
            i,
            first_page + i
        );
        if i > 0 {
            item.push_str(&format!(" /Prev {} 0 R", first_item + i - 1));
        }
        if i + 1 < n as u32 {
            item.push_str(&format!(" /Next {} 0 R", first_item + i + 1));
        }
        item.push_str(" >>");
        b.object(first_item + i, &item);
    }
    b.finish_classic(" /Root 1 0 R");
    b.into_bytes()
}

/// Replace the first occurrence of `from` with `to`, byte for byte.
pub fn patch(data: &[u8], from: &str, to: &str) -> Vec<u8> {
    let pos = data
        .windows(from.len())
        .position(|w| w == from.as_bytes())
        .unwrap();
    let mut out = data[..pos].to_vec();
    out.extend_from_slice(to.as_bytes());
    out.extend_from_slice(&data[pos + from.len()..]);
    out
}
