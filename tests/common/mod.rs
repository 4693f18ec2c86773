//! Feed documents shared by the integration tests.

#![allow(dead_code)]

pub const ITMS_NS: &str = "http://phobos.apple.com/rss/1.0/modules/itms/";

/// A feed with `n` fully populated items named `Song 0` .. `Song n-1`.
pub fn generated_feed(n: usize) -> String {
    let mut feed = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <rss version=\"2.0\" xmlns:itms=\"{}\">\n<channel>\n<title>New Releases</title>\n",
        ITMS_NS
    );
    for i in 0..n {
        feed.push_str(&format!(
            "<item>\n<title>Song {i} &amp; Friends</title>\n<category>Genre {g}</category>\n\
             <itms:artist>Artist {i}</itms:artist>\n<itms:album>Album {i}</itms:album>\n\
             <itms:releasedate>March {d}, 2024</itms:releasedate>\n\
             <itms:coverArt height=\"60\" width=\"60\">http://example.com/{i}.jpg</itms:coverArt>\n\
             </item>\n",
            i = i,
            g = i % 4,
            d = i % 28 + 1,
        ));
    }
    feed.push_str("</channel>\n</rss>\n");
    feed
}

/// Expected title of item `i` in [`generated_feed`].
pub fn title_of(i: usize) -> String {
    format!("Song {} & Friends", i)
}

/// [`generated_feed`] with CRLF line ends, a line break inside every title
/// and a lone CR inside every album.
pub fn crlf_feed(n: usize) -> String {
    generated_feed(n)
        .replace("&amp; Friends", "&amp;\nFriends")
        .replace('\n', "\r\n")
        .replace("<itms:album>Album ", "<itms:album>Album\r")
}
