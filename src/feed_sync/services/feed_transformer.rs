use crate::feed_sync::domain::{
    AffectedProductVersion, FeedContent, FeedId, VulnerabilityRecord, VERSION_PREV_UNSET,
};
use crate::feed_sync::policies::FeedSelection;
use crate::shared::error::SyncError;
use crate::shared::SyncResult;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::{BTreeMap, BTreeSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Records and tuples produced from one feed document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedTransform {
    pub records: Vec<VulnerabilityRecord>,
    pub affected: Vec<AffectedProductVersion>,
    /// Yearly feeds touched by the entries of an aggregate feed.
    /// Always empty for yearly feeds.
    pub implied_years: BTreeSet<u16>,
    /// Entries dropped because of their type or reject marker
    pub skipped_entries: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformOutcome {
    Complete(FeedTransform),
    /// Cancellation was observed before an entry; nothing should be written
    Cancelled,
}

/// FeedTransformer service converting NVD 1.2 XML feeds into records
///
/// Layout of the documents it understands:
///
/// ```text
/// <nvd>
///   <entry type="CVE" name="CVE-2015-0001" seq="2015-0001" reject="1"? ...>
///     <desc><descript>free text</descript></desc>
///     <vuln_soft>
///       <prod name="windows_7" vendor="microsoft">
///         <vers num="sp1" prev="1"?/>
///       </prod>
///     </vuln_soft>
///   </entry>
/// </nvd>
/// ```
pub struct FeedTransformer;

impl FeedTransformer {
    /// Parses a feed and builds its records
    ///
    /// # Errors
    /// Returns `SyncError::Parse` for malformed XML, an empty document, an
    /// entry without `name`, or a product/version missing a mandatory
    /// attribute.
    pub fn transform(
        content: &FeedContent,
        cancel: &CancellationToken,
    ) -> SyncResult<TransformOutcome> {
        let feed = content.feed();
        let mut reader = Reader::from_reader(content.bytes());
        let mut buf = Vec::new();
        let mut state = ParseState::new(feed);

        loop {
            let event = reader.read_event_into(&mut buf).map_err(|e| {
                parse_error(
                    feed,
                    format!("{} (at byte {})", e, reader.buffer_position()),
                )
            })?;

            match event {
                Event::Start(e) => {
                    if state.opens_entry() && cancel.is_cancelled() {
                        return Ok(TransformOutcome::Cancelled);
                    }
                    state.open(&e)?;
                }
                Event::Empty(e) => {
                    if state.opens_entry() && cancel.is_cancelled() {
                        return Ok(TransformOutcome::Cancelled);
                    }
                    state.open(&e)?;
                    state.close()?;
                }
                Event::Text(e) => {
                    if state.is_capturing() {
                        let text = e
                            .unescape()
                            .map_err(|err| parse_error(feed, err.to_string()))?;
                        state.push_text(&text);
                    }
                }
                Event::CData(e) => {
                    if state.is_capturing() {
                        state.push_text(&String::from_utf8_lossy(&e.into_inner()));
                    }
                }
                Event::End(_) => state.close()?,
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        let transform = state.finish()?;
        debug!(
            feed = %feed,
            records = transform.records.len(),
            affected = transform.affected.len(),
            skipped = transform.skipped_entries,
            implied_years = transform.implied_years.len(),
            "Transformed feed"
        );
        Ok(TransformOutcome::Complete(transform))
    }
}

fn parse_error(feed: FeedId, details: impl Into<String>) -> SyncError {
    SyncError::Parse {
        feed: feed.to_string(),
        details: details.into(),
    }
}

struct ProductBuilder {
    name: Option<String>,
    vendor: Option<String>,
    /// (num, prev) attribute pairs
    versions: Vec<(Option<String>, Option<String>)>,
}

struct EntryBuilder {
    attributes: BTreeMap<String, String>,
    retained: bool,
    description: Option<String>,
    products: Vec<ProductBuilder>,
}

impl EntryBuilder {
    fn new(attributes: BTreeMap<String, String>) -> Self {
        let retained = attributes.get("type").map(String::as_str) == Some("CVE")
            && attributes.get("reject").map(String::as_str) != Some("1");
        Self {
            attributes,
            retained,
            description: None,
            products: Vec::new(),
        }
    }
}

struct ParseState {
    feed: FeedId,
    /// Local names of the currently open elements, root first
    stack: Vec<Vec<u8>>,
    root_seen: bool,
    current: Option<EntryBuilder>,
    /// Stack depth of the `descript` element being captured
    capture_depth: Option<usize>,
    output: FeedTransform,
}

impl ParseState {
    fn new(feed: FeedId) -> Self {
        Self {
            feed,
            stack: Vec::new(),
            root_seen: false,
            current: None,
            capture_depth: None,
            output: FeedTransform::default(),
        }
    }

    /// True when the next opened element is a direct child of the root
    fn opens_entry(&self) -> bool {
        self.stack.len() == 1
    }

    fn is_capturing(&self) -> bool {
        self.capture_depth.is_some()
    }

    fn push_text(&mut self, text: &str) {
        if let Some(description) = self
            .current
            .as_mut()
            .and_then(|entry| entry.description.as_mut())
        {
            description.push_str(text);
        }
    }

    fn open(&mut self, element: &BytesStart) -> SyncResult<()> {
        let name = element.local_name().as_ref().to_vec();

        match self.stack.len() {
            0 => {
                if self.root_seen {
                    return Err(parse_error(self.feed, "multiple root elements"));
                }
                self.root_seen = true;
            }
            1 => {
                let attributes = read_attributes(self.feed, element)?;
                self.current = Some(EntryBuilder::new(attributes));
            }
            _ => self.open_entry_child(&name, element)?,
        }

        self.stack.push(name);
        Ok(())
    }

    fn open_entry_child(&mut self, name: &[u8], element: &BytesStart) -> SyncResult<()> {
        let feed = self.feed;
        let depth = self.stack.len();
        let Some(entry) = self.current.as_mut().filter(|entry| entry.retained) else {
            return Ok(());
        };

        // Path of open elements below the entry itself
        let path: Vec<&[u8]> = self.stack[2..].iter().map(Vec::as_slice).collect();
        match (path.as_slice(), name) {
            ([b"desc"], b"descript") if entry.description.is_none() => {
                entry.description = Some(String::new());
                self.capture_depth = Some(depth + 1);
            }
            ([b"vuln_soft"], b"prod") => {
                let mut attributes = read_attributes(feed, element)?;
                entry.products.push(ProductBuilder {
                    name: attributes.remove("name"),
                    vendor: attributes.remove("vendor"),
                    versions: Vec::new(),
                });
            }
            ([b"vuln_soft", b"prod"], b"vers") => {
                let mut attributes = read_attributes(feed, element)?;
                if let Some(product) = entry.products.last_mut() {
                    product
                        .versions
                        .push((attributes.remove("num"), attributes.remove("prev")));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self) -> SyncResult<()> {
        if self.capture_depth == Some(self.stack.len()) {
            self.capture_depth = None;
        }

        self.stack
            .pop()
            .ok_or_else(|| parse_error(self.feed, "closing tag without matching opening tag"))?;

        if self.stack.len() == 1 {
            if let Some(entry) = self.current.take() {
                self.finish_entry(entry)?;
            }
        }
        Ok(())
    }

    fn finish_entry(&mut self, entry: EntryBuilder) -> SyncResult<()> {
        if !entry.retained {
            self.output.skipped_entries += 1;
            return Ok(());
        }

        let id = entry
            .attributes
            .get("name")
            .cloned()
            .ok_or_else(|| parse_error(self.feed, "CVE entry without a name attribute"))?;

        if self.feed.is_aggregate() {
            match implied_year(&entry.attributes, &id) {
                Some(year) => {
                    self.output.implied_years.insert(year);
                }
                None => warn!(feed = %self.feed, cve = %id, "Cannot derive a feed year for entry"),
            }
        }

        for product in entry.products {
            let product_name = product.name.ok_or_else(|| {
                parse_error(self.feed, format!("{}: product without a name attribute", id))
            })?;
            let vendor = product.vendor.ok_or_else(|| {
                parse_error(
                    self.feed,
                    format!("{}: product {} without a vendor attribute", id, product_name),
                )
            })?;

            for (num, prev) in product.versions {
                let version = num.ok_or_else(|| {
                    parse_error(
                        self.feed,
                        format!("{}: version of {} without a num attribute", id, product_name),
                    )
                })?;
                let version_prev = match prev {
                    None => VERSION_PREV_UNSET,
                    Some(prev) => prev.trim().parse::<u32>().unwrap_or_else(|_| {
                        warn!(
                            feed = %self.feed,
                            cve = %id,
                            product = %product_name,
                            prev = %prev,
                            "Ignoring non-numeric prev value"
                        );
                        VERSION_PREV_UNSET
                    }),
                };

                self.output.affected.push(AffectedProductVersion::new(
                    id.clone(),
                    product_name.clone(),
                    vendor.clone(),
                    version,
                    version_prev,
                ));
            }
        }

        let description = entry.description.unwrap_or_default().trim().to_string();
        self.output
            .records
            .push(VulnerabilityRecord::new(id, description, entry.attributes));
        Ok(())
    }

    fn finish(self) -> SyncResult<FeedTransform> {
        if !self.root_seen {
            return Err(parse_error(self.feed, "document has no root element"));
        }
        if !self.stack.is_empty() {
            return Err(parse_error(self.feed, "unexpected end of document"));
        }
        Ok(self.output)
    }
}

fn read_attributes(feed: FeedId, element: &BytesStart) -> SyncResult<BTreeMap<String, String>> {
    let mut attributes = BTreeMap::new();
    for attribute in element.attributes() {
        let attribute = attribute.map_err(|e| parse_error(feed, e.to_string()))?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).to_string();
        let value = attribute
            .unescape_value()
            .map_err(|e| parse_error(feed, e.to_string()))?
            .to_string();
        attributes.insert(key, value);
    }
    Ok(attributes)
}

/// Year of the yearly feed holding an aggregate entry: taken from `seq`
/// ("2015-0001"), falling back to the identifier ("CVE-2015-0001").
fn implied_year(attributes: &BTreeMap<String, String>, id: &str) -> Option<u16> {
    let from_seq = attributes
        .get("seq")
        .and_then(|seq| seq.get(..4))
        .and_then(parse_year);
    let year = from_seq.or_else(|| {
        id.strip_prefix("CVE-")
            .and_then(|rest| rest.get(..4))
            .and_then(parse_year)
    })?;
    Some(FeedSelection::clamp_to_feed_year(year))
}

fn parse_year(digits: &str) -> Option<u16> {
    if digits.len() == 4 && digits.bytes().all(|b| b.is_ascii_digit()) {
        digits.parse().ok()
    } else {
        None
    }
}
