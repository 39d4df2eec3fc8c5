//! Style injection against a minimal document model. At document-start
//! timing the head may not exist yet, so the applicator queues styles and
//! flushes them exactly once when the head appears.

#[derive(Debug, Default)]
struct Head {
    styles: Vec<String>,
    links: Vec<String>,
}

/// The part of a page the applicator can see: a head that holds injected
/// style blocks and stylesheet links, or no head yet.
#[derive(Debug, Default)]
pub struct Document {
    head: Option<Head>,
}

impl Document {
    pub fn with_head() -> Self {
        Self {
            head: Some(Head::default()),
        }
    }

    pub fn without_head() -> Self {
        Self { head: None }
    }

    pub fn has_head(&self) -> bool {
        self.head.is_some()
    }

    /// Injected style blocks, in apply order.
    pub fn styles(&self) -> &[String] {
        self.head.as_ref().map(|h| h.styles.as_slice()).unwrap_or(&[])
    }

    /// Injected stylesheet link hrefs, in apply order.
    pub fn links(&self) -> &[String] {
        self.head.as_ref().map(|h| h.links.as_slice()).unwrap_or(&[])
    }

    /// Renders the injected links and styles as head elements.
    pub fn render_head(&self) -> String {
        let mut out = String::new();
        for href in self.links() {
            out.push_str(&format!("<link rel=\"stylesheet\" href=\"{href}\">\n"));
        }
        for css in self.styles() {
            out.push_str("<style>\n");
            out.push_str(css);
            if !css.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("</style>\n");
        }
        out
    }
}

/// Additive-only style insertion. There is no removal or update path;
/// styles live for the life of the document.
#[derive(Debug, Default)]
pub struct StyleApplicator {
    pending_styles: Vec<String>,
    pending_links: Vec<String>,
    flushed: bool,
}

impl StyleApplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a style block to the head, or queues it until the head
    /// exists.
    pub fn apply(&mut self, doc: &mut Document, css: &str) {
        match doc.head.as_mut() {
            Some(head) => head.styles.push(css.to_string()),
            None => self.pending_styles.push(css.to_string()),
        }
    }

    /// Appends a stylesheet `<link>` to the head, or queues it until the
    /// head exists. Used for externally hosted font sheets.
    pub fn apply_link(&mut self, doc: &mut Document, href: &str) {
        match doc.head.as_mut() {
            Some(head) => head.links.push(href.to_string()),
            None => self.pending_links.push(href.to_string()),
        }
    }

    /// One-shot head-creation hook: flushes queued links and styles in
    /// apply order, then stops watching.
    pub fn head_created(&mut self, doc: &mut Document) {
        if self.flushed {
            return;
        }
        self.flushed = true;
        let head = doc.head.get_or_insert_with(Head::default);
        head.links.append(&mut self.pending_links);
        head.styles.append(&mut self.pending_styles);
    }

    pub fn pending_count(&self) -> usize {
        self.pending_styles.len() + self.pending_links.len()
    }
}
