use std::io::{Cursor, Write};

use anyhow::{Context, Result};
use chrono::DateTime;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::codec::decode_description;
use crate::storage::{Feed, Item};

/// Renders a feed as an RSS 2.0 document.
///
/// The output is unindented: `<?xml ...?><rss version="2.0"><channel>...`.
/// Channel and item text is XML-escaped; descriptions are base64-decoded and
/// wrapped in CDATA. An item whose description does not decode is left out
/// and the rest of the feed still renders.
///
/// # Errors
///
/// Only fails if the XML writer itself fails, which for an in-memory buffer
/// indicates a bug rather than bad input.
pub fn render_rss(feed: &Feed) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .context("Failed to write XML declaration")?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    writer
        .write_event(Event::Start(rss))
        .context("Failed to write rss element")?;
    writer
        .write_event(Event::Start(BytesStart::new("channel")))
        .context("Failed to write channel element")?;

    write_text_element(&mut writer, "title", &feed.metadata.title)?;
    write_text_element(&mut writer, "link", &feed.metadata.link)?;
    write_text_element(&mut writer, "description", &feed.metadata.description)?;

    for item in &feed.items {
        match decode_description(item) {
            Ok(description) => write_item(&mut writer, item, &description)?,
            Err(e) => {
                tracing::warn!(item = %item.title, error = %e, "Cannot decode item description, omitting from RSS");
            }
        }
    }

    writer
        .write_event(Event::End(BytesEnd::new("channel")))
        .context("Failed to write channel end")?;
    writer
        .write_event(Event::End(BytesEnd::new("rss")))
        .context("Failed to write rss end")?;

    let result = writer.into_inner().into_inner();
    String::from_utf8(result).context("Generated RSS contains invalid UTF-8")
}

fn write_item<W: Write>(writer: &mut Writer<W>, item: &Item, description: &str) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new("item")))
        .context("Failed to write item element")?;

    write_text_element(writer, "title", &item.title)?;
    write_text_element(writer, "link", &item.link)?;

    writer
        .write_event(Event::Start(BytesStart::new("description")))
        .context("Failed to write description element")?;
    write_cdata(writer, description)?;
    writer
        .write_event(Event::End(BytesEnd::new("description")))
        .context("Failed to write description end")?;

    if let Some(date) = item.date.as_deref() {
        write_text_element(writer, "pubDate", &pub_date(date))?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("item")))
        .context("Failed to write item end")?;
    Ok(())
}

fn write_text_element<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .with_context(|| format!("Failed to write {name} element"))?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .with_context(|| format!("Failed to write {name} text"))?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .with_context(|| format!("Failed to write {name} end"))?;
    Ok(())
}

/// CDATA cannot contain `]]>`; split it across adjacent sections instead.
fn write_cdata<W: Write>(writer: &mut Writer<W>, text: &str) -> Result<()> {
    let mut rest = text;
    while let Some(pos) = rest.find("]]>") {
        let (head, tail) = rest.split_at(pos + 2);
        writer
            .write_event(Event::CData(BytesCData::new(head)))
            .context("Failed to write CDATA section")?;
        rest = tail;
    }
    writer
        .write_event(Event::CData(BytesCData::new(rest)))
        .context("Failed to write CDATA section")?;
    Ok(())
}

/// RFC 3339 dates become RFC 2822 as RSS expects; anything else passes through.
fn pub_date(date: &str) -> String {
    DateTime::parse_from_rfc3339(date)
        .map(|dt| dt.to_rfc2822())
        .unwrap_or_else(|_| date.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FeedMetadata;
    use pretty_assertions::assert_eq;

    fn feed_with(items: Vec<Item>) -> Feed {
        Feed {
            metadata: FeedMetadata {
                title: "T".to_string(),
                description: "D".to_string(),
                link: "L".to_string(),
            },
            items,
        }
    }

    fn item(title: &str, description: &str) -> Item {
        Item {
            title: title.to_string(),
            link: format!("https://example.com/{title}"),
            description: description.to_string(),
            date: None,
        }
    }

    #[test]
    fn test_empty_feed_envelope() {
        let rss = render_rss(&feed_with(vec![])).unwrap();
        assert_eq!(
            rss,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><rss version=\"2.0\"><channel>\
             <title>T</title><link>L</link><description>D</description>\
             </channel></rss>"
        );
    }

    #[test]
    fn test_item_description_is_decoded_into_cdata() {
        let rss = render_rss(&feed_with(vec![item("a", "PGI+aGk8L2I+")])).unwrap();
        assert!(rss.contains(
            "<item><title>a</title><link>https://example.com/a</link>\
             <description><![CDATA[<b>hi</b>]]></description></item>"
        ));
    }

    #[test]
    fn test_bad_description_omits_only_that_item() {
        let rss = render_rss(&feed_with(vec![item("bad", "@@@"), item("good", "aGk=")])).unwrap();
        assert!(!rss.contains("<title>bad</title>"));
        assert!(rss.contains("<title>good</title>"));
        assert!(rss.contains("<![CDATA[hi]]>"));
    }

    #[test]
    fn test_text_is_escaped() {
        let mut feed = feed_with(vec![item("Fish & Chips <3", "")]);
        feed.metadata.title = "A<B>".to_string();

        let rss = render_rss(&feed).unwrap();
        assert!(rss.contains("<title>A&lt;B&gt;</title>"));
        assert!(rss.contains("<title>Fish &amp; Chips &lt;3</title>"));
    }

    #[test]
    fn test_cdata_terminator_is_split() {
        // "a]]>b"
        let rss = render_rss(&feed_with(vec![item("x", "YV1dPmI=")])).unwrap();
        assert!(rss.contains("<description><![CDATA[a]]]]><![CDATA[>b]]></description>"));
    }

    #[test]
    fn test_pub_date_conversion() {
        let mut dated = item("d", "");
        dated.date = Some("2024-01-15T10:30:00Z".to_string());
        let mut raw = item("r", "");
        raw.date = Some("yesterday".to_string());

        let rss = render_rss(&feed_with(vec![dated, raw])).unwrap();
        assert!(rss.contains("<pubDate>Mon, 15 Jan 2024 10:30:00 +0000</pubDate>"));
        assert!(rss.contains("<pubDate>yesterday</pubDate>"));
    }
}
