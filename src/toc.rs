use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::cli::TocArgs;
use crate::formats::{TocDescriptor, TocEntry, strip_fragment};
use crate::markup::xml_escape;

pub const NCX_FILE_NAME: &str = "toc.ncx";
pub const OPF_FILE_NAME: &str = "content.opf";
pub const COVER_FILE_NAME: &str = "cover-image.jpg";

/// A node of the navigation tree.
///
/// Nodes created only to reach a deeper entry (a depth jump of more than one
/// level) keep every field `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavNode {
    pub label: Option<String>,
    pub order: Option<i64>,
    pub id: Option<String>,
    pub href: Option<String>,
    pub children: Vec<NavNode>,
}

impl NavNode {
    pub fn is_placeholder(&self) -> bool {
        self.id.is_none() && self.label.is_none()
    }

    /// Pre-order walk over this node and its descendants.
    pub fn walk<'a>(&'a self, out: &mut Vec<&'a NavNode>) {
        out.push(self);
        for child in &self.children {
            child.walk(out);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationDocuments {
    pub ncx: String,
    pub opf: String,
}

/// Builds the navigation tree from the flat, depth-annotated entry list.
///
/// Keeps one child index per level. An entry deeper than its predecessor opens
/// a fresh first child at its level; any other entry becomes the next sibling
/// of the most recent node at its level.
pub fn build_nav_tree(entries: &[TocEntry]) -> Vec<NavNode> {
    let mut root = NavNode::default();
    let mut indexes: Vec<usize> = Vec::new();
    let mut last_depth: Option<u32> = None;

    for entry in entries {
        let depth = entry.nav_depth();
        let level = depth as usize - 1;
        if indexes.len() <= level {
            indexes.resize(level + 1, 0);
        }

        match last_depth {
            Some(last) if last >= depth => indexes[level] += 1,
            _ => indexes[level] = 0,
        }

        let mut point = &mut root;
        for &index in &indexes[..=level] {
            if point.children.len() <= index {
                point.children.resize_with(index + 1, NavNode::default);
            }
            point = &mut point.children[index];
        }

        point.label = Some(entry.label.clone());
        point.order = Some(entry.order);
        point.id = Some(entry.id.clone());
        point.href = Some(entry.href.clone());

        last_depth = Some(depth);
    }

    root.children
}

pub fn render_navigation(toc: &TocDescriptor) -> NavigationDocuments {
    let tree = build_nav_tree(&toc.items);
    NavigationDocuments {
        ncx: render_ncx(toc, &tree),
        opf: render_opf(toc),
    }
}

fn render_ncx(toc: &TocDescriptor, tree: &[NavNode]) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\" standalone=\"no\"?>\n");
    out.push_str(
        "<ncx xmlns=\"http://www.daisy.org/z3986/2005/ncx/\" version=\"2005-1\">\n",
    );
    out.push_str("  <head>\n");
    out.push_str("    <meta name=\"cover\" content=\"cover\"/>\n");
    out.push_str(&format!(
        "    <meta name=\"dtb:uid\" content=\"isbn:{}\"/>\n",
        xml_escape(&toc.book_id)
    ));
    out.push_str(&format!(
        "    <meta name=\"dtb:depth\" content=\"{}\"/>\n",
        toc.max_depth()
    ));
    out.push_str("    <meta name=\"dtb:totalPageCount\" content=\"0\"/>\n");
    out.push_str("    <meta name=\"dtb:maxPageNumber\" content=\"0\"/>\n");
    out.push_str("  </head>\n");
    out.push_str("  <docTitle><text>");
    out.push_str(&xml_escape(&toc.title));
    out.push_str("</text></docTitle>\n");
    out.push_str("  <docAuthor><text>");
    out.push_str(&xml_escape(&toc.authors_display()));
    out.push_str("</text></docAuthor>\n");
    out.push_str("  <navMap>\n");
    for node in tree {
        push_nav_point(&mut out, node, 2);
    }
    out.push_str("  </navMap>\n");
    out.push_str("</ncx>\n");
    out
}

fn push_nav_point(out: &mut String, node: &NavNode, indent: usize) {
    let pad = "  ".repeat(indent);
    let order = node.order.map(|order| order.to_string()).unwrap_or_default();
    out.push_str(&format!(
        "{pad}<navPoint id=\"{}\" playOrder=\"{}\">\n",
        xml_escape(node.id.as_deref().unwrap_or_default()),
        order
    ));
    out.push_str(&format!(
        "{pad}  <navLabel><text>{}</text></navLabel>\n",
        xml_escape(node.label.as_deref().unwrap_or_default())
    ));
    out.push_str(&format!(
        "{pad}  <content src=\"{}\"/>\n",
        xml_escape(strip_fragment(node.href.as_deref().unwrap_or_default()))
    ));
    for child in &node.children {
        push_nav_point(out, child, indent + 1);
    }
    out.push_str(&format!("{pad}</navPoint>\n"));
}

fn render_opf(toc: &TocDescriptor) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\" standalone=\"no\"?>\n");
    out.push_str(
        "<package xmlns=\"http://www.idpf.org/2007/opf\" version=\"2.0\" unique-identifier=\"bookid\">\n",
    );
    out.push_str(
        "  <metadata xmlns:dc=\"http://purl.org/dc/elements/1.1/\" xmlns:opf=\"http://www.idpf.org/2007/opf\">\n",
    );
    out.push_str(&format!(
        "    <dc:identifier id=\"bookid\">urn:isbn:{}</dc:identifier>\n",
        xml_escape(&toc.book_id)
    ));
    out.push_str(&format!("    <dc:title>{}</dc:title>\n", xml_escape(&toc.title)));
    if let Some(publisher) = &toc.publisher {
        out.push_str(&format!(
            "    <dc:publisher>{}</dc:publisher>\n",
            xml_escape(&publisher.name)
        ));
    }
    if let Some(pub_date) = &toc.pub_date {
        out.push_str(&format!("    <dc:date>{}</dc:date>\n", xml_escape(pub_date)));
    }
    if !toc.authors.is_empty() {
        let authors = xml_escape(&toc.authors_display());
        out.push_str(&format!(
            "    <dc:creator opf:file-as=\"{authors}\">{authors}</dc:creator>\n"
        ));
    }
    out.push_str("    <dc:language>en</dc:language>\n");
    out.push_str("    <meta name=\"cover\" content=\"cover-image\"/>\n");
    out.push_str("  </metadata>\n");

    out.push_str("  <manifest>\n");
    out.push_str(&format!(
        "    <item id=\"ncxtoc\" href=\"{NCX_FILE_NAME}\" media-type=\"application/x-dtbncx+xml\"/>\n"
    ));
    out.push_str(&format!(
        "    <item id=\"cover-image\" href=\"{COVER_FILE_NAME}\" media-type=\"image/jpeg\"/>\n"
    ));
    for entry in &toc.items {
        out.push_str(&format!(
            "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"/>\n",
            xml_escape(&entry.id),
            xml_escape(entry.href_without_fragment()),
            xml_escape(&entry.media_type)
        ));
    }
    out.push_str("  </manifest>\n");

    out.push_str("  <spine toc=\"ncxtoc\">\n");
    out.push_str("    <itemref idref=\"cover-image\" linear=\"no\"/>\n");
    for entry in toc.items.iter().filter(|entry| entry.is_content_document()) {
        out.push_str(&format!(
            "    <itemref idref=\"{}\"/>\n",
            xml_escape(&entry.id)
        ));
    }
    out.push_str("  </spine>\n");
    out.push_str("</package>\n");
    out
}

/// Renders `toc.ncx` and `content.opf` from a saved TOC descriptor.
pub fn render(args: TocArgs) -> anyhow::Result<()> {
    let input_path = PathBuf::from(&args.input);
    let out_dir = PathBuf::from(&args.out);

    let raw = std::fs::read_to_string(&input_path)
        .with_context(|| format!("read toc descriptor: {}", input_path.display()))?;
    let toc: TocDescriptor = serde_json::from_str(&raw)
        .with_context(|| format!("parse toc descriptor: {}", input_path.display()))?;

    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("create toc output dir: {}", out_dir.display()))?;

    let docs = render_navigation(&toc);
    tracing::info!(
        book_id = %toc.book_id,
        entries = toc.items.len(),
        depth = toc.max_depth(),
        out = %out_dir.display(),
        "rendered navigation documents"
    );

    write_document(&out_dir.join(NCX_FILE_NAME), &docs.ncx, args.force)?;
    write_document(&out_dir.join(OPF_FILE_NAME), &docs.opf, args.force)?;
    Ok(())
}

fn write_document(path: &Path, contents: &str, force: bool) -> anyhow::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true);
    if force {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    let mut out = options
        .open(path)
        .with_context(|| format!("open output: {}", path.display()))?;
    out.write_all(contents.as_bytes())
        .with_context(|| format!("write: {}", path.display()))?;
    out.flush().context("flush output")?;
    Ok(())
}
