use std::fs;
use std::path::{Path, PathBuf};

const HEX_FRAMES: [&[u8]; 3] = [b":ADBED00E204DF\n", b":A0102000543\n", b":AEDEC00E0FFB0\n"];

const MPPT_READINGS: [Reading; 4] = [
    Reading::new("13580", "6900", "56790", "96"),
    Reading::new("13590", "6950", "56810", "97"),
    Reading::new("13600", "7010", "56770", "98"),
    Reading::new("13610", "7000", "56750", "98"),
];

fn main() -> Result<(), String> {
    let root = PathBuf::from("tests/golden");
    write_mppt_fixtures(&root)?;
    write_bmv_fixtures(&root)?;
    Ok(())
}

fn write_mppt_fixtures(root: &Path) -> Result<(), String> {
    let blocks: Vec<Vec<u8>> = MPPT_READINGS.iter().map(|r| block(&r.mppt_fields())).collect();

    write_capture(root.join("mppt").join("input.ved"), &blocks.concat())?;

    let mut hex = Vec::new();
    hex.extend_from_slice(&blocks[0]);
    hex.extend_from_slice(HEX_FRAMES[0]);
    hex.extend_from_slice(&blocks[1]);
    hex.extend_from_slice(HEX_FRAMES[1]);
    hex.extend_from_slice(HEX_FRAMES[2]);
    hex.extend_from_slice(&blocks[2]);
    hex.extend_from_slice(&blocks[3]);
    write_capture(root.join("mppt_hex").join("input.ved"), &hex)?;

    // Line noise ahead of the first block, then a flipped digit in the second.
    let mut corrupted = vec![0x00, 0x13];
    for (index, block) in blocks.iter().enumerate() {
        let mut block = block.clone();
        if index == 1 {
            let at = find(&block, b"56810").ok_or("reading not found in block")?;
            block[at] = b'7';
        }
        corrupted.extend_from_slice(&block);
    }
    corrupted.extend_from_slice(&blocks[0]);
    corrupted.extend_from_slice(&blocks[1]);
    write_capture(root.join("mppt_corrupted").join("input.ved"), &corrupted)?;
    Ok(())
}

fn write_bmv_fixtures(root: &Path) -> Result<(), String> {
    let history = block(&[
        ("H1", "-102560"),
        ("H2", "-52800"),
        ("H3", "-102560"),
        ("H4", "25"),
        ("H5", "0"),
        ("H6", "-2846340"),
        ("H7", "11022"),
        ("H8", "14423"),
        ("H9", "86400"),
        ("H10", "14"),
        ("H11", "0"),
        ("H12", "0"),
        ("H17", "4520"),
        ("H18", "5621"),
    ]);

    let mut data = Vec::new();
    for (v, i, p, soc) in [
        ("12810", "-3360", "-44", "987"),
        ("12800", "-3400", "-44", "986"),
        ("12790", "-3420", "-44", "985"),
    ] {
        data.extend(block(&[
            ("PID", "0x203"),
            ("V", v),
            ("I", i),
            ("P", p),
            ("CE", "-1234"),
            ("SOC", soc),
            ("TTG", "-1"),
            ("Alarm", "OFF"),
            ("Relay", "OFF"),
            ("AR", "0"),
            ("BMV", "700"),
            ("FW", "0308"),
        ]));
        data.extend_from_slice(&history);
    }
    write_capture(root.join("bmv_split").join("input.ved"), &data)
}

struct Reading {
    v: &'static str,
    i: &'static str,
    vpv: &'static str,
    ppv: &'static str,
}

impl Reading {
    const fn new(v: &'static str, i: &'static str, vpv: &'static str, ppv: &'static str) -> Self {
        Self { v, i, vpv, ppv }
    }

    fn mppt_fields(&self) -> Vec<(&'static str, &'static str)> {
        vec![
            ("PID", "0xA056"),
            ("FW", "130"),
            ("SER#", "HQ1804IWW4P"),
            ("V", self.v),
            ("I", self.i),
            ("VPV", self.vpv),
            ("PPV", self.ppv),
            ("CS", "3"),
            ("MPPT", "2"),
            ("ERR", "0"),
            ("LOAD", "OFF"),
            ("IL", "0"),
            ("H19", "467"),
            ("H20", "4"),
            ("H21", "96"),
            ("H22", "22"),
            ("H23", "117"),
            ("HSDS", "25"),
        ]
    }
}

/// Encodes one checksummed text block.
fn block(fields: &[(&str, &str)]) -> Vec<u8> {
    let mut data = Vec::new();
    for (key, value) in fields {
        data.extend_from_slice(b"\r\n");
        data.extend_from_slice(key.as_bytes());
        data.push(b'\t');
        data.extend_from_slice(value.as_bytes());
    }
    data.extend_from_slice(b"\r\nChecksum\t");
    let sum = data.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    data.push(0u8.wrapping_sub(sum));
    data
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn write_capture(path: PathBuf, data: &[u8]) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| format!("failed to create {}: {}", parent.display(), err))?;
    }
    fs::write(&path, data).map_err(|err| format!("failed to write {}: {}", path.display(), err))
}
