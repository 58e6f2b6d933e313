use dotdeps::{graph::AssemblyNode, AnalysisResult};
use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, Event},
    Writer,
};

use super::{is_single_local, name_groups, VisualizerOptions};

/// Every name group with something to report, with its versions and their referers.
pub fn render(result: &AnalysisResult, options: &VisualizerOptions) -> anyhow::Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new("Assemblies")))?;

    for group in name_groups(result) {
        if options.skip_system && group[0].is_system() {
            continue;
        }
        if is_single_local(&group) {
            continue;
        }

        let referers: Vec<Vec<&AssemblyNode>> = group
            .iter()
            .map(|node| {
                let mut referers: Vec<&AssemblyNode> = result
                    .referenced_by(node.id())
                    .filter(|referer| options.accepts_referer(&referer.effective_identity().name))
                    .collect();
                referers.sort_by_key(|referer| referer.effective_identity().display_name());
                referers
            })
            .collect();

        if options.referenced_name_prefix.is_some() && referers.iter().all(Vec::is_empty) {
            continue;
        }

        let identity = group[0].effective_identity();
        let version = identity.version.to_string();
        let full_name = identity.display_name();
        writer.write_event(Event::Start(BytesStart::new("Assembly").with_attributes([
            ("Name", identity.name.as_str()),
            ("Version", version.as_str()),
            ("FullName", full_name.as_str()),
        ])))?;

        for (node, referers) in group.iter().zip(referers) {
            let source = node.source().to_string();
            let location = node.location().map(|path| path.display().to_string());

            let mut reference = BytesStart::new("Reference");
            reference.push_attribute(("Source", source.as_str()));
            if let Some(location) = &location {
                reference.push_attribute(("Location", location.as_str()));
            }

            if referers.is_empty() {
                writer.write_event(Event::Empty(reference))?;
                continue;
            }

            writer.write_event(Event::Start(reference))?;
            for referer in referers {
                let identity = referer.effective_identity();
                let full_name = identity.display_name();
                writer.write_event(Event::Empty(BytesStart::new("Referer").with_attributes([
                    ("Name", identity.name.as_str()),
                    ("FullName", full_name.as_str()),
                ])))?;
            }
            writer.write_event(Event::End(BytesEnd::new("Reference")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("Assembly")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("Assemblies")))?;
    Ok(String::from_utf8(writer.into_inner())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Fixture;

    #[test]
    fn conflicting_group() {
        let mut fixture = Fixture::new();
        fixture.file("App", "1.0.0.0", &[("Lib", "1.0.0.0")]);
        fixture.file("Tool", "1.0.0.0", &[("Lib", "2.0.0.0")]);
        let lib = fixture.file("Lib", "2.0.0.0", &[]);
        let result = fixture.analyze();

        let xml = render(&result, &VisualizerOptions::default()).unwrap();
        let expected = format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<Assemblies>
    <Assembly Name="Lib" Version="1.0.0.0" FullName="Lib, Version=1.0.0.0, Culture=neutral, PublicKeyToken=null">
        <Reference Source="NotFound">
            <Referer Name="App" FullName="App, Version=1.0.0.0, Culture=neutral, PublicKeyToken=null"/>
        </Reference>
        <Reference Source="Local" Location="{}">
            <Referer Name="Tool" FullName="Tool, Version=1.0.0.0, Culture=neutral, PublicKeyToken=null"/>
        </Reference>
    </Assembly>
</Assemblies>"#,
            lib.display()
        );
        assert_eq!(xml, expected);
    }

    #[test]
    fn referer_prefix_filters_groups() {
        let mut fixture = Fixture::new();
        fixture.file("App", "1.0.0.0", &[("Gone", "1.0.0.0")]);
        fixture.file("Tool", "1.0.0.0", &[("Missing", "1.0.0.0")]);
        let result = fixture.analyze();

        let options = VisualizerOptions {
            referenced_name_prefix: Some("tool".to_string()),
            ..VisualizerOptions::default()
        };
        let xml = render(&result, &options).unwrap();
        assert!(xml.contains("Name=\"Missing\""));
        assert!(!xml.contains("Name=\"Gone\""));
        assert!(!xml.contains("Name=\"App\""));
    }

    #[test]
    fn skips_system_groups() {
        let mut fixture = Fixture::new();
        fixture.file("App", "1.0.0.0", &[("System.Core", "4.0.0.0")]);
        let result = fixture.analyze();

        let options = VisualizerOptions {
            skip_system: true,
            ..VisualizerOptions::default()
        };
        let xml = render(&result, &options).unwrap();
        assert!(!xml.contains("System.Core"));
        assert!(xml.ends_with("</Assemblies>"));
    }
}
