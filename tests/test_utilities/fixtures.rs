use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;

/// One affected product version: (product, vendor, num, prev)
///
/// Consecutive rows for the same product share one `<prod>` element.
pub type Affected<'a> = (&'a str, &'a str, &'a str, Option<&'a str>);

/// Builder for NVD 1.2 feed documents
#[derive(Default)]
pub struct FeedDocument {
    entries: Vec<String>,
}

impl FeedDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a CVE entry with the given affected products
    pub fn entry(mut self, id: &str, description: &str, products: &[Affected]) -> Self {
        self.entries.push(render_entry(id, description, products, ""));
        self
    }

    /// Adds an entry carrying the reject marker
    pub fn rejected(mut self, id: &str) -> Self {
        self.entries.push(render_entry(
            id,
            "** REJECT ** DO NOT USE THIS CANDIDATE NUMBER.",
            &[],
            r#" reject="1""#,
        ));
        self
    }

    pub fn build(&self) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<nvd xmlns=\"http://nvd.nist.gov/feeds/cve/1.2\" nvd_xml_version=\"1.2\">\n{}</nvd>\n",
            self.entries.concat()
        )
    }
}

fn render_entry(id: &str, description: &str, products: &[Affected], extra: &str) -> String {
    let seq = id.trim_start_matches("CVE-");
    let mut xml = format!(
        "  <entry type=\"CVE\" name=\"{}\" seq=\"{}\" published=\"2015-01-13\" severity=\"High\"{}>\n    <desc><descript source=\"cve\">{}</descript></desc>\n",
        id, seq, extra, description
    );
    if !products.is_empty() {
        xml.push_str("    <vuln_soft>\n");
        let mut open: Option<(&str, &str)> = None;
        for &(name, vendor, num, prev) in products {
            if open != Some((name, vendor)) {
                if open.is_some() {
                    xml.push_str("      </prod>\n");
                }
                xml.push_str(&format!(
                    "      <prod name=\"{}\" vendor=\"{}\">\n",
                    name, vendor
                ));
                open = Some((name, vendor));
            }
            match prev {
                Some(prev) => xml.push_str(&format!(
                    "        <vers num=\"{}\" prev=\"{}\"/>\n",
                    num, prev
                )),
                None => xml.push_str(&format!("        <vers num=\"{}\"/>\n", num)),
            }
        }
        xml.push_str("      </prod>\n    </vuln_soft>\n");
    }
    xml.push_str("  </entry>\n");
    xml
}

/// Feed with one product/version pair per identifier
pub fn simple_feed(ids: &[&str]) -> String {
    ids.iter()
        .fold(FeedDocument::new(), |doc, id| {
            doc.entry(id, "Buffer overflow", &[("openssl", "openssl", "1.0.2", None)])
        })
        .build()
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}
