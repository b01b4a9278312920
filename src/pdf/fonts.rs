//! Standard Type1 font used for text watermarks
//!
//! Helvetica-Bold is one of the 14 standard PDF fonts, so it never needs to
//! be embedded. Its advance widths are needed to center a string.

use lopdf::{Dictionary, Document, Object, ObjectId};

/// Resource name the watermark font is registered under
pub const FONT_RESOURCE: &str = "F1";

/// Advance widths (1/1000 em) for WinAnsi codes 32..=126
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, // space ! " # $ % & ' ( )
    389, 584, 278, 333, 278, 278, 556, 556, 556, 556, // * + , - . / 0 1 2 3
    556, 556, 556, 556, 556, 556, 333, 333, 584, 584, // 4 5 6 7 8 9 : ; < =
    584, 611, 975, 722, 722, 722, 722, 667, 611, 778, // > ? @ A B C D E F G
    722, 278, 556, 722, 611, 833, 722, 778, 667, 778, // H I J K L M N O P Q
    722, 667, 611, 722, 667, 944, 667, 667, 611, 333, // R S T U V W X Y Z [
    278, 333, 584, 556, 333, 556, 611, 556, 611, 556, // \ ] ^ _ ` a b c d e
    333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // f g h i j k l m n o
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, // p q r s t u v w x y
    500, 389, 280, 389, 584,                          // z { | } ~
];

/// Width used for Latin-1 supplement characters
const DEFAULT_WIDTH: u16 = 556;

/// Encode text for a WinAnsi simple font
///
/// Printable ASCII and Latin-1 supplement characters map to their own code;
/// anything else becomes `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| match ch as u32 {
            code @ 0x20..=0x7E => code as u8,
            code @ 0xA0..=0xFF => code as u8,
            _ => b'?',
        })
        .collect()
}

/// Width of WinAnsi-encoded text in points
pub fn text_width(encoded: &[u8], font_size: f32) -> f32 {
    let units: u32 = encoded
        .iter()
        .map(|&code| match code {
            0x20..=0x7E => HELVETICA_BOLD_WIDTHS[(code - 0x20) as usize] as u32,
            _ => DEFAULT_WIDTH as u32,
        })
        .sum();

    units as f32 * font_size / 1000.0
}

/// Add a Helvetica-Bold font dictionary to the document
pub fn add_helvetica_bold(doc: &mut Document) -> ObjectId {
    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set("BaseFont", Object::Name(b"Helvetica-Bold".to_vec()));
    font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));

    doc.add_object(Object::Dictionary(font))
}

/// Hex string operand for a `Tj` operator
pub fn hex_string(encoded: &[u8]) -> String {
    let mut out = String::with_capacity(encoded.len() * 2 + 2);
    out.push('<');
    for byte in encoded {
        out.push_str(&format!("{:02X}", byte));
    }
    out.push('>');
    out
}
