//! Minimal WAV containers for providers that want a file, not raw audio

use bytes::{BufMut, Bytes, BytesMut};
use voice_gateway_core::{AudioEncoding, AudioFormat};

const FORMAT_PCM: u16 = 1;
const FORMAT_MULAW: u16 = 7;

/// Header size for PCM16: RIFF + fmt + data
pub const PCM_HEADER_LEN: usize = 44;

/// Header size for μ-law: RIFF + fmt + fact + data
pub const MULAW_HEADER_LEN: usize = 56;

/// Wrap raw mono audio in a WAV container
pub fn to_wav(data: &[u8], format: AudioFormat) -> Bytes {
    let header_len = match format.encoding {
        AudioEncoding::Pcm16 => PCM_HEADER_LEN,
        AudioEncoding::Mulaw => MULAW_HEADER_LEN,
    };
    let bytes_per_sample = format.encoding.bytes_per_sample() as u16;
    let data_len = data.len() as u32;

    let mut buf = BytesMut::with_capacity(header_len + data.len());
    buf.put_slice(b"RIFF");
    buf.put_u32_le((header_len - 8) as u32 + data_len);
    buf.put_slice(b"WAVE");

    buf.put_slice(b"fmt ");
    buf.put_u32_le(16);
    buf.put_u16_le(match format.encoding {
        AudioEncoding::Pcm16 => FORMAT_PCM,
        AudioEncoding::Mulaw => FORMAT_MULAW,
    });
    buf.put_u16_le(1); // mono
    buf.put_u32_le(format.sample_rate);
    buf.put_u32_le(format.sample_rate * bytes_per_sample as u32);
    buf.put_u16_le(bytes_per_sample);
    buf.put_u16_le(bytes_per_sample * 8);

    // Non-PCM formats carry a sample count
    if format.encoding == AudioEncoding::Mulaw {
        buf.put_slice(b"fact");
        buf.put_u32_le(4);
        buf.put_u32_le(data_len);
    }

    buf.put_slice(b"data");
    buf.put_u32_le(data_len);
    buf.put_slice(data);
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::pcm16_to_bytes;

    #[test]
    fn test_pcm_header_readable_by_hound() {
        let samples: Vec<i16> = (0..160).map(|i| (i * 50) as i16).collect();
        let wav = to_wav(&pcm16_to_bytes(&samples), AudioFormat::new(AudioEncoding::Pcm16, 16000));
        assert_eq!(wav.len(), PCM_HEADER_LEN + 320);

        let mut reader = hound::WavReader::new(std::io::Cursor::new(wav.to_vec())).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 16000);
        assert_eq!(spec.bits_per_sample, 16);
        let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, samples);
    }

    #[test]
    fn test_mulaw_header_layout() {
        let data = vec![0xFFu8; 80];
        let wav = to_wav(&data, AudioFormat::telephony());
        assert_eq!(wav.len(), MULAW_HEADER_LEN + 80);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes([wav[4], wav[5], wav[6], wav[7]]), 48 + 80);
        assert_eq!(u16::from_le_bytes([wav[20], wav[21]]), FORMAT_MULAW);
        assert_eq!(u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]), 8000);
        assert_eq!(&wav[36..40], b"fact");
        assert_eq!(&wav[48..52], b"data");
        assert_eq!(u32::from_le_bytes([wav[52], wav[53], wav[54], wav[55]]), 80);
        assert_eq!(&wav[56..], &data[..]);
    }
}
