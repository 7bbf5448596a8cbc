use spg_common::{Baht, THB_NUMERIC_CODE};

use super::{crc16::crc16_ccitt_false, payee_id::PayeeIdentifier};

const PAYLOAD_FORMAT_INDICATOR: &str = "01";
/// Point of initiation `12`: a dynamic, single-use QR. Every checkout gets a fresh payload.
const POI_METHOD_DYNAMIC: &str = "12";
/// The application id that marks a merchant-account field as PromptPay.
const PROMPTPAY_AID: &str = "A000000677010111";
const COUNTRY_CODE: &str = "TH";

/// One TLV field: two-digit tag, two-digit value length, value.
/// Values are always short here; anything near the 99-char ceiling would be a bug upstream.
fn tlv(tag: &str, value: &str) -> String {
    format!("{tag}{:02}{value}", value.len())
}

/// Builds the scannable PromptPay payload for the given payee and amount.
///
/// Field order is part of the wire contract — banking apps are not guaranteed to parse fields
/// out of order, so this emits exactly: payload format (00), point of initiation (01), merchant
/// account info (29, nested AID + proxy id), currency (53), amount (54, omitted when zero or
/// absent), country (58), and the CRC (63) computed over everything before it *including* the
/// literal `6304` tag-and-length prefix.
pub fn qr_payload(payee: &PayeeIdentifier, amount: Option<Baht>) -> String {
    let merchant_info = format!("{}{}", tlv("00", PROMPTPAY_AID), tlv("01", payee.as_str()));
    let mut payload = String::with_capacity(128);
    payload.push_str(&tlv("00", PAYLOAD_FORMAT_INDICATOR));
    payload.push_str(&tlv("01", POI_METHOD_DYNAMIC));
    payload.push_str(&tlv("29", &merchant_info));
    payload.push_str(&tlv("53", THB_NUMERIC_CODE));
    if let Some(amount) = amount.filter(|a| a.is_positive()) {
        payload.push_str(&tlv("54", &amount.format_qr()));
    }
    payload.push_str(&tlv("58", COUNTRY_CODE));
    payload.push_str("6304");
    let crc = crc16_ccitt_false(&payload);
    payload.push_str(&crc);
    payload
}
