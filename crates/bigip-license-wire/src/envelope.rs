//! `getLicense` request envelope.
//!
//! The envelope is a fixed SOAP 1.1 document rendered through Handlebars.
//! Values go through Handlebars' HTML escaping, whose entities are all valid
//! XML, so they can never break out of their element.

use bigip_license_core::{Dossier, LicenseRequest, ACTIVATION_SERVICE_PATH};
use handlebars::{html_escape, Handlebars};
use once_cell::sync::Lazy;
use serde::Serialize;

use crate::error::EnvelopeError;

const ENVELOPE_TEMPLATE_NAME: &str = "get_license";

const ENVELOPE_TEMPLATE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<SOAP-ENV:Envelope xmlns:ns3="http://www.w3.org/2001/XMLSchema"
                   xmlns:SOAP-ENC="http://schemas.xmlsoap.org/soap/encoding/"
                   xmlns:ns0="http://schemas.xmlsoap.org/soap/encoding/"
                   xmlns:ns1="https://{{license_server}}{{service_path}}"
                   xmlns:ns2="http://schemas.xmlsoap.org/soap/envelope/"
                   xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
                   xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/"
                   SOAP-ENV:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">
  <SOAP-ENV:Header/>
  <ns2:Body>
    <ns1:getLicense>
      <dossier xsi:type="ns3:string">{{dossier}}</dossier>
      <eula xsi:type="ns3:string">{{eula}}</eula>
      <email xsi:type="ns3:string">{{email}}</email>
      <firstName xsi:type="ns3:string">{{first_name}}</firstName>
      <lastName xsi:type="ns3:string">{{last_name}}</lastName>
      <companyName xsi:type="ns3:string">{{company}}</companyName>
      <phone xsi:type="ns3:string">{{phone}}</phone>
      <jobTitle xsi:type="ns3:string">{{job_title}}</jobTitle>
      <address xsi:type="ns3:string">{{address}}</address>
      <city xsi:type="ns3:string">{{city}}</city>
      <stateProvince xsi:type="ns3:string">{{state_province}}</stateProvince>
      <postalCode xsi:type="ns3:string">{{postal_code}}</postalCode>
      <country xsi:type="ns3:string">{{country}}</country>
    </ns1:getLicense>
  </ns2:Body>
</SOAP-ENV:Envelope>"#;

static REGISTRY: Lazy<Handlebars<'static>> = Lazy::new(|| {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(true);
    handlebars.register_escape_fn(html_escape);
    if let Err(e) = handlebars.register_template_string(ENVELOPE_TEMPLATE_NAME, ENVELOPE_TEMPLATE) {
        tracing::error!(error = %e, "activation envelope template failed to compile");
    }
    handlebars
});

#[derive(Serialize)]
struct EnvelopeFields<'a> {
    license_server: &'a str,
    service_path: &'a str,
    dossier: &'a str,
    eula: &'a str,
    email: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    company: &'a str,
    phone: &'a str,
    job_title: &'a str,
    address: &'a str,
    city: &'a str,
    state_province: &'a str,
    postal_code: &'a str,
    country: &'a str,
}

/// Renders the request envelope; `eula` is empty until the authority sends one
pub fn render_envelope(
    request: &LicenseRequest,
    dossier: &Dossier,
    eula: &str,
) -> Result<String, EnvelopeError> {
    let contact = &request.contact;
    let fields = EnvelopeFields {
        license_server: &request.license_server,
        service_path: ACTIVATION_SERVICE_PATH,
        dossier: dossier.as_str(),
        eula,
        email: &contact.email,
        first_name: &contact.first_name,
        last_name: &contact.last_name,
        company: &contact.company,
        phone: &contact.phone,
        job_title: &contact.job_title,
        address: &contact.address,
        city: &contact.city,
        state_province: &contact.state_province,
        postal_code: &contact.postal_code,
        country: &contact.country,
    };

    REGISTRY
        .render(ENVELOPE_TEMPLATE_NAME, &fields)
        .map_err(|e| EnvelopeError::Render(e.to_string()))
}
