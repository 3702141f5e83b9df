use crate::error::{Error, Result};
use crate::route::TrackPoint;
use crate::selector::Marker;

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const GPX_NS: &str = "http://www.topografix.com/GPX/1/1";
const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
const SCHEMA_LOCATION: &str =
    "http://www.topografix.com/GPX/1/1 http://www.topografix.com/GPX/1/1/gpx.xsd";
const CREATOR: &str = "https://github.com/thof/RouteStreetViewer";

pub const MISSING_IMAGE_NOTE: &str = "Missing Google Street View image<br>";

/// Writes markers and the raw track as a GPX 1.1 document.
///
/// Every marker becomes a `<wpt>` whose `<extensions>` carry an `<html>`
/// payload for the route viewer: `src="<images>/<name>"|<note>` in a CDATA
/// section plus an `<exist/>` flag when the image was downloaded, or the
/// missing-image note otherwise. Featured markers get a `<feature/>` flag.
pub struct RouteExporter {
    track_name: String,
    images_ref: String,
}

impl RouteExporter {
    /// `images_ref` is the image folder as the viewer should reference it.
    pub fn new(track_name: &str, images_ref: &str) -> Self {
        Self {
            track_name: track_name.to_string(),
            images_ref: images_ref.trim_end_matches('/').to_string(),
        }
    }

    pub fn write_file(&self, fname: &Path, markers: &[Marker],
                      track: &[TrackPoint]) -> Result<()> {
        let file = File::create(fname).map_err(|e| Error::file(fname, e))?;
        let mut buf = BufWriter::new(file);

        self.write(&mut buf, markers, track)?;
        buf.flush().map_err(|e| Error::file(fname, e))
    }

    pub fn write<W: Write>(&self, out: W, markers: &[Marker],
                           track: &[TrackPoint]) -> Result<()> {
        let mut writer = Writer::new_with_indent(out, b' ', 2);

        emit(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

        let mut gpx = BytesStart::new("gpx");
        gpx.push_attribute(("xmlns", GPX_NS));
        gpx.push_attribute(("xmlns:xsi", XSI_NS));
        gpx.push_attribute(("xsi:schemaLocation", SCHEMA_LOCATION));
        gpx.push_attribute(("creator", CREATOR));
        gpx.push_attribute(("version", "1.1"));
        emit(&mut writer, Event::Start(gpx))?;

        for marker in markers {
            self.write_waypoint(&mut writer, marker)?;
        }

        emit(&mut writer, Event::Start(BytesStart::new("trk")))?;
        text_element(&mut writer, "name", &self.track_name)?;
        emit(&mut writer, Event::Start(BytesStart::new("trkseg")))?;

        for p in track {
            let mut trkpt = BytesStart::new("trkpt");
            trkpt.push_attribute(("lat", p.lat().to_string().as_str()));
            trkpt.push_attribute(("lon", p.lon().to_string().as_str()));
            emit(&mut writer, Event::Start(trkpt))?;
            text_element(&mut writer, "ele", &p.ele.to_string())?;
            emit(&mut writer, Event::End(BytesEnd::new("trkpt")))?;
        }

        emit(&mut writer, Event::End(BytesEnd::new("trkseg")))?;
        emit(&mut writer, Event::End(BytesEnd::new("trk")))?;
        emit(&mut writer, Event::End(BytesEnd::new("gpx")))?;

        writer.get_mut().write_all(b"\n")?;

        Ok(())
    }

    /// The `<html>` payload for an available image.
    pub fn image_payload(&self, marker: &Marker) -> String {
        format!("src=\"{}/{}\"|{}", self.images_ref, marker.image_name(),
                marker.note)
    }

    fn write_waypoint<W: Write>(&self, writer: &mut Writer<W>,
                                marker: &Marker) -> Result<()> {
        let mut wpt = BytesStart::new("wpt");
        wpt.push_attribute(("lat", marker.point.lat().to_string().as_str()));
        wpt.push_attribute(("lon", marker.point.lon().to_string().as_str()));
        emit(writer, Event::Start(wpt))?;

        text_element(writer, "ele", &marker.point.ele.to_string())?;
        text_element(writer, "name", &marker.image_name())?;

        emit(writer, Event::Start(BytesStart::new("extensions")))?;
        emit(writer, Event::Start(BytesStart::new("html")))?;

        if marker.image_available {
            let payload = self.image_payload(marker);
            emit(writer, Event::CData(BytesCData::new(payload.as_str())))?;
            emit(writer, Event::End(BytesEnd::new("html")))?;
            emit(writer, Event::Empty(BytesStart::new("exist")))?;
        }
        else {
            let note = format!("{}{}", MISSING_IMAGE_NOTE, marker.note);
            emit(writer, Event::Text(BytesText::new(&note)))?;
            emit(writer, Event::End(BytesEnd::new("html")))?;
        }

        if marker.featured {
            emit(writer, Event::Empty(BytesStart::new("feature")))?;
        }

        emit(writer, Event::End(BytesEnd::new("extensions")))?;
        emit(writer, Event::End(BytesEnd::new("wpt")))
    }
}

fn emit<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<()> {
    writer.write_event(event).map_err(|e| Error::Export(e.to_string()))
}

fn text_element<W: Write>(writer: &mut Writer<W>, name: &str, text: &str)
                          -> Result<()> {
    emit(writer, Event::Start(BytesStart::new(name)))?;
    emit(writer, Event::Text(BytesText::new(text)))?;
    emit(writer, Event::End(BytesEnd::new(name)))
}
