//! Viewer page served at `/index.html`

pub const INDEX_PAGE: &str = "\
<html>
<head>
<title>facewatch</title>
</head>
<body>
<h1>Live feed</h1>
<img src=\"stream.mjpg\" width=\"640\" height=\"480\" />
</body>
</html>
";
