//! Helpers for navigating parsed XML documents.

use roxmltree::Node;

/// Find the first descendant element with the given namespace and local name.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use oai_connector::xml::find_descendant;
///
/// let xml = r#"<mets xmlns:m="urn:m"><dmdSec><m:record/></dmdSec></mets>"#;
/// let doc = Document::parse(xml).unwrap();
///
/// assert!(find_descendant(doc.root_element(), "urn:m", "record").is_some());
/// assert!(find_descendant(doc.root_element(), "urn:m", "dmdSec").is_none());
/// ```
pub fn find_descendant<'a, 'input>(
    node: Node<'a, 'input>,
    namespace: &str,
    tag: &str,
) -> Option<Node<'a, 'input>> {
    node.descendants().find(|n| {
        n.is_element() && n.tag_name().name() == tag && n.tag_name().namespace() == Some(namespace)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use roxmltree::Document;

    const METS: &str = r#"<mets:mets xmlns:mets="http://www.loc.gov/METS/" xmlns:marc="http://www.loc.gov/MARC21/slim">
  <mets:dmdSec ID="DMD1">
    <mets:mdWrap MDTYPE="MARC">
      <mets:xmlData>
        <marc:record><marc:leader>text</marc:leader></marc:record>
      </mets:xmlData>
    </mets:mdWrap>
  </mets:dmdSec>
</mets:mets>"#;

    #[test]
    fn test_find_descendant_matches_namespace() {
        let doc = Document::parse(METS).unwrap();
        let record = find_descendant(doc.root_element(), "http://www.loc.gov/MARC21/slim", "record");
        assert!(record.is_some());
        assert!(find_descendant(doc.root_element(), "urn:other", "record").is_none());
    }

    #[test]
    fn test_find_descendant_is_depth_first() {
        let doc = Document::parse(METS).unwrap();
        let leader = find_descendant(doc.root_element(), "http://www.loc.gov/MARC21/slim", "leader")
            .unwrap();
        assert_eq!(leader.text(), Some("text"));
    }
}
