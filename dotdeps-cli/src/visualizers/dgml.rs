use dotdeps::{classify::AssemblySource, AnalysisResult};
use quick_xml::{
    escape::escape,
    events::{BytesDecl, BytesEnd, BytesStart, Event},
    Writer,
};

use super::VisualizerOptions;

const DGML_NAMESPACE: &str = "http://schemas.microsoft.com/vs/2009/dgml";

const SOURCE_COLORS: [(AssemblySource, &str); 4] = [
    (AssemblySource::NotFound, "#FF0000"),
    (AssemblySource::Local, "#008000"),
    (AssemblySource::GlobalCache, "#FFFF00"),
    (AssemblySource::Unknown, "#808080"),
];

/// A Visual Studio directed graph document with one category per assembly source.
pub fn render(result: &AnalysisResult, options: &VisualizerOptions) -> anyhow::Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new("DirectedGraph").with_attributes([
        ("Title", "AsmSpy:References"),
        ("xmlns", DGML_NAMESPACE),
    ])))?;

    let shown = |system: bool| !(options.skip_system && system);

    writer.write_event(Event::Start(BytesStart::new("Nodes")))?;
    for node in result.assemblies().filter(|node| shown(node.is_system())) {
        let identity = node.effective_identity();
        let full_name = identity.display_name();

        // The label may carry a character reference, so it is escaped by hand.
        let mut label = escape(identity.name.as_str()).into_owned();
        if options.dgml_show_version {
            label.push_str(&format!("&#13;{}", identity.version));
        }

        let mut element = BytesStart::new("Node");
        element.push_attribute(("Id", full_name.as_str()));
        element.push_attribute((b"Label".as_slice(), label.as_bytes()));
        element.push_attribute(("Category", "Assembly"));
        writer.write_event(Event::Start(element))?;

        let source = node.source().to_string();
        writer.write_event(Event::Empty(
            BytesStart::new("Category").with_attributes([("Ref", source.as_str())]),
        ))?;
        writer.write_event(Event::End(BytesEnd::new("Node")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("Nodes")))?;

    writer.write_event(Event::Start(BytesStart::new("Links")))?;
    for node in result.assemblies().filter(|node| shown(node.is_system())) {
        let source = node.effective_identity().display_name();
        for target in result
            .references(node.id())
            .filter(|target| shown(target.is_system()))
        {
            let target = target.effective_identity().display_name();
            writer.write_event(Event::Empty(BytesStart::new("Link").with_attributes([
                ("Source", source.as_str()),
                ("Target", target.as_str()),
                ("Category", "Reference"),
            ])))?;
        }
    }
    writer.write_event(Event::End(BytesEnd::new("Links")))?;

    writer.write_event(Event::Start(BytesStart::new("Categories")))?;
    for id in ["Assembly", "Reference"] {
        writer.write_event(Event::Empty(
            BytesStart::new("Category").with_attributes([("Id", id)]),
        ))?;
    }
    for (source, color) in SOURCE_COLORS {
        let source = source.to_string();
        writer.write_event(Event::Empty(BytesStart::new("Category").with_attributes([
            ("Id", source.as_str()),
            ("Label", source.as_str()),
            ("Background", color),
            ("IsTag", "True"),
        ])))?;
    }
    writer.write_event(Event::End(BytesEnd::new("Categories")))?;

    writer.write_event(Event::Start(BytesStart::new("Styles")))?;
    for (source, color) in SOURCE_COLORS {
        let group_label = format!("AssemblySource: {source}");
        let condition = format!("HasCategory('{source}')");
        writer.write_event(Event::Start(BytesStart::new("Style").with_attributes([
            ("TargetType", "Node"),
            ("GroupLabel", group_label.as_str()),
            ("ValueLabel", "Has category"),
        ])))?;
        writer.write_event(Event::Empty(
            BytesStart::new("Condition").with_attributes([("Expression", condition.as_str())]),
        ))?;
        writer.write_event(Event::Empty(BytesStart::new("Setter").with_attributes([
            ("Property", "Background"),
            ("Value", color),
        ])))?;
        writer.write_event(Event::End(BytesEnd::new("Style")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("Styles")))?;

    writer.write_event(Event::End(BytesEnd::new("DirectedGraph")))?;
    Ok(String::from_utf8(writer.into_inner())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Fixture;

    #[test]
    fn nodes_links_and_categories() {
        let mut fixture = Fixture::new();
        fixture.file("App", "1.0.0.0", &[("Lib", "1.0.0.0"), ("Gone", "2.0.0.0")]);
        fixture.file("Lib", "1.0.0.0", &[]);
        let result = fixture.analyze();

        let dgml = render(&result, &VisualizerOptions::default()).unwrap();

        assert!(dgml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(dgml.contains(
            "<DirectedGraph Title=\"AsmSpy:References\" xmlns=\"http://schemas.microsoft.com/vs/2009/dgml\">"
        ));
        assert!(dgml.contains(
            "<Node Id=\"App, Version=1.0.0.0, Culture=neutral, PublicKeyToken=null\" Label=\"App\" Category=\"Assembly\">"
        ));
        assert!(dgml.contains("<Category Ref=\"NotFound\"/>"));
        assert!(dgml.contains(
            "<Link Source=\"App, Version=1.0.0.0, Culture=neutral, PublicKeyToken=null\" Target=\"Gone, Version=2.0.0.0, Culture=neutral, PublicKeyToken=null\" Category=\"Reference\"/>"
        ));
        assert!(dgml.contains(
            "<Category Id=\"GlobalCache\" Label=\"GlobalCache\" Background=\"#FFFF00\" IsTag=\"True\"/>"
        ));
        assert!(dgml.contains("<Condition Expression=\"HasCategory(&apos;Local&apos;)\"/>"));
        assert_eq!(dgml.matches("<Link ").count(), 2);
        assert!(dgml.trim_end().ends_with("</DirectedGraph>"));
    }

    #[test]
    fn version_labels_and_system_filter() {
        let mut fixture = Fixture::new();
        fixture.file("App", "1.0.0.0", &[("System.Xml", "4.0.0.0")]);
        let result = fixture.analyze();

        let options = VisualizerOptions {
            dgml_show_version: true,
            skip_system: true,
            ..VisualizerOptions::default()
        };
        let dgml = render(&result, &options).unwrap();

        assert!(dgml.contains("Label=\"App&#13;1.0.0.0\""));
        assert!(!dgml.contains("System.Xml"));
        assert_eq!(dgml.matches("<Link ").count(), 0);
    }
}
